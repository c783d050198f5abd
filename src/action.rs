#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    /// Out-of-cycle refresh, subject to the debounce
    Refresh,
    CycleSort,
    /// Pointer moved or clicked at a terminal cell
    Pointer {
        column: u16,
        row: u16,
        click: bool,
    },
    None,
}

use std::fmt;

/// How the repository grid is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Discovery order
    #[default]
    Default,
    Alphabetical,
    ByStatus,
}

impl SortMode {
    pub fn next(self) -> Self {
        match self {
            SortMode::Default => SortMode::Alphabetical,
            SortMode::Alphabetical => SortMode::ByStatus,
            SortMode::ByStatus => SortMode::Default,
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::Default => write!(f, "Default"),
            SortMode::Alphabetical => write!(f, "Alphabetical"),
            SortMode::ByStatus => write!(f, "Status"),
        }
    }
}

/// Compute the display order: a permutation of `0..repos.len()`.
///
/// Names compare byte-wise. Status ties are broken by name so that re-sorting
/// the same data always gives the same order.
pub fn compute_order<S: AsRef<str>>(repos: &[S], statuses: &[S], mode: SortMode) -> Vec<usize> {
    let mut order: Vec<usize> = (0..repos.len()).collect();
    let name = |i: usize| repos[i].as_ref().as_bytes();
    let status = |i: usize| statuses.get(i).map(|s| s.as_ref()).unwrap_or("").as_bytes();

    match mode {
        SortMode::Default => {}
        SortMode::Alphabetical => order.sort_by(|&a, &b| name(a).cmp(name(b))),
        SortMode::ByStatus => {
            order.sort_by(|&a, &b| status(a).cmp(status(b)).then_with(|| name(a).cmp(name(b))))
        }
    }
    order
}

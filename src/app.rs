use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tokio_util::sync::CancellationToken;

use crate::action::Action;
use crate::collector;
use crate::config::Settings;
use crate::event::Event;
use crate::layout::{Command, Hit, LayoutGeometry};
use crate::sort::{compute_order, SortMode};
use crate::status::{self, StatusEntry, CATEGORY_COUNT, LOADING, STATUS_TABLE};
use crate::worker::FetchPool;

pub const SPINNER: [char; 8] = ['🌑', '🌒', '🌓', '🌔', '🌕', '🌖', '🌗', '🌘'];
pub const SPIN_INTERVAL: Duration = Duration::from_millis(125);
/// Bounded readiness wait per frame; also the frame pacing.
pub const COLLECT_WAIT: Duration = Duration::from_millis(100);
/// Minimum time between two refresh rounds requested by the user.
pub const REFRESH_DEBOUNCE: Duration = Duration::from_secs(1);

/// Everything the renderer needs for one frame.
pub struct DisplayState<'a> {
    /// (repository name, status entry) in display order
    pub cells: Vec<(&'a str, &'static StatusEntry)>,
    pub seconds_left: u64,
    pub spinner: char,
    pub tooltip: Option<String>,
    /// Footer button under the pointer
    pub highlighted: Option<Command>,
    pub layout: &'a LayoutGeometry,
}

pub struct App {
    pub repos: Vec<String>,
    pub statuses: Vec<String>,
    pub user_count: usize,
    pub sort_mode: SortMode,
    pub order: Vec<usize>,
    pub hover: Option<(u16, u16)>,
    pub layout: LayoutGeometry,
    pub spinner_index: usize,
    pub should_quit: bool,
    /// Fetch rounds started so far
    pub rounds: u64,
    ordered_for: SortMode,
    last_spin: Instant,
    last_refresh: Instant,
    poll_interval: Duration,
    pool: FetchPool,
}

impl App {
    /// `cancel` interrupts a fetch round that is waiting for a free slot.
    pub fn new(
        repos: Vec<String>,
        user_count: usize,
        settings: &Settings,
        cancel: CancellationToken,
    ) -> Self {
        let now = Instant::now();
        let statuses = vec![LOADING.to_string(); repos.len()];
        let order = (0..repos.len()).collect();
        Self {
            repos,
            statuses,
            user_count,
            sort_mode: SortMode::default(),
            order,
            hover: None,
            layout: LayoutGeometry::default(),
            spinner_index: 0,
            should_quit: false,
            rounds: 0,
            ordered_for: SortMode::default(),
            last_spin: now,
            last_refresh: now,
            poll_interval: settings.poll_interval,
            pool: FetchPool::new(
                settings.commands.status.clone(),
                settings.max_concurrent,
                settings.fetch_timeout,
            )
            .with_cancel(cancel),
        }
    }

    pub fn handle_event(&self, event: Event) -> Action {
        if event.is_quit() {
            return Action::Quit;
        }
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize => Action::None,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => Action::Quit,
            KeyCode::Char(' ') => Action::Refresh,
            KeyCode::Char('s') | KeyCode::Char('S') => Action::CycleSort,
            _ => Action::None,
        }
    }

    fn handle_mouse(&self, mouse: MouseEvent) -> Action {
        let click = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => true,
            MouseEventKind::Moved | MouseEventKind::Drag(_) | MouseEventKind::Up(_) => false,
            _ => return Action::None,
        };
        Action::Pointer {
            column: mouse.column,
            row: mouse.row,
            click,
        }
    }

    pub async fn update(&mut self, action: Action) {
        self.apply(action, Instant::now()).await;
    }

    async fn apply(&mut self, action: Action, now: Instant) {
        match action {
            Action::Quit => {
                self.should_quit = true;
            }
            Action::Refresh => self.request_refresh(now).await,
            Action::CycleSort => {
                self.sort_mode = self.sort_mode.next();
            }
            Action::Pointer { column, row, click } => {
                self.hover = Some((column, row));
                if !click {
                    return;
                }
                match self.layout.hit_test(column, row, &self.order) {
                    Hit::Button(Command::Quit) => self.should_quit = true,
                    Hit::Button(Command::Refresh) => self.request_refresh(now).await,
                    Hit::Button(Command::CycleSort) => self.sort_mode = self.sort_mode.next(),
                    _ => {}
                }
            }
            Action::None => {}
        }
    }

    /// Start a round unless the previous one started less than
    /// [`REFRESH_DEBOUNCE`] ago.
    async fn request_refresh(&mut self, now: Instant) {
        if now.duration_since(self.last_refresh) >= REFRESH_DEBOUNCE {
            self.start_round(now).await;
        } else {
            tracing::debug!("refresh ignored, last round started too recently");
        }
    }

    /// Tear down the current round and start a new one. The poll interval
    /// counts from the moment spawning finished, never from before it.
    pub async fn start_round(&mut self, now: Instant) {
        self.pool.spawn_all(&self.repos, &mut self.statuses).await;
        self.last_refresh = now.max(Instant::now());
        self.rounds += 1;
    }

    pub fn refresh_due(&self, now: Instant) -> bool {
        now.duration_since(self.last_refresh) >= self.poll_interval
    }

    pub fn seconds_until_refresh(&self, now: Instant) -> u64 {
        self.poll_interval
            .saturating_sub(now.duration_since(self.last_refresh))
            .as_secs()
    }

    pub fn tick_spinner(&mut self, now: Instant) {
        if now.duration_since(self.last_spin) >= SPIN_INTERVAL {
            self.spinner_index = (self.spinner_index + 1) % SPINNER.len();
            self.last_spin = now;
        }
    }

    /// Read whatever the running queries have produced, waiting at most
    /// [`COLLECT_WAIT`].
    pub async fn collect(&mut self) -> usize {
        collector::collect(&mut self.pool, &mut self.statuses, COLLECT_WAIT).await
    }

    /// Recompute the display order if the sort mode changed since the last call.
    pub fn refresh_order(&mut self) {
        if self.ordered_for != self.sort_mode {
            self.order = compute_order(&self.repos, &self.statuses, self.sort_mode);
            self.ordered_for = self.sort_mode;
        }
    }

    pub fn counts(&self) -> [usize; CATEGORY_COUNT] {
        status::count_by_category(&self.statuses)
    }

    pub fn relayout(&mut self, area: Rect) {
        self.layout = LayoutGeometry::compute(
            area.width,
            area.height,
            self.repos.len(),
            self.user_count,
            &self.counts(),
            self.sort_mode,
        );
    }

    pub fn hovered(&self) -> Hit {
        match self.hover {
            Some((x, y)) => self.layout.hit_test(x, y, &self.order),
            None => Hit::None,
        }
    }

    pub fn tooltip(&self, counts: &[usize; CATEGORY_COUNT]) -> Option<String> {
        match self.hovered() {
            Hit::Repo(id) => Some(status::describe(&self.statuses[id])),
            Hit::Badge(category) => Some(format!(
                "{} ({})",
                STATUS_TABLE[category].label, counts[category]
            )),
            Hit::Button(command) => Some(command.tooltip().to_string()),
            Hit::None => None,
        }
    }

    pub fn display_state(&self, now: Instant) -> DisplayState<'_> {
        let counts = self.counts();
        let highlighted = match self.hovered() {
            Hit::Button(command) => Some(command),
            _ => None,
        };
        DisplayState {
            cells: self
                .order
                .iter()
                .map(|&id| (self.repos[id].as_str(), status::classify(&self.statuses[id])))
                .collect(),
            tooltip: self.tooltip(&counts),
            seconds_left: self.seconds_until_refresh(now),
            spinner: SPINNER[self.spinner_index],
            highlighted,
            layout: &self.layout,
        }
    }

    /// Close every stream and reap every process still owned by the dashboard.
    pub async fn shutdown(&mut self) {
        let reaped = self.pool.teardown().await;
        tracing::debug!(
            "shutdown reaped {} fetches, peak concurrency {}",
            reaped,
            self.pool.peak_running()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommandTemplate, CommandsConfig};
    use crossterm::event::KeyModifiers;

    fn settings(script: &str) -> Settings {
        Settings {
            poll_interval: Duration::from_secs(300),
            max_concurrent: 4,
            fetch_timeout: Duration::from_secs(10),
            commands: CommandsConfig {
                discover: CommandTemplate::new("true", Vec::<String>::new()),
                status: CommandTemplate::new("sh", ["-c", script, "{repo}"]),
            },
            warnings: Vec::new(),
        }
    }

    fn app(names: &[&str]) -> App {
        let repos = names.iter().map(|s| s.to_string()).collect();
        let mut app = App::new(
            repos,
            1,
            &settings("echo completed success"),
            CancellationToken::new(),
        );
        app.relayout(Rect::new(0, 0, 100, 30));
        app
    }

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    fn click(column: u16, row: u16) -> Action {
        Action::Pointer {
            column,
            row,
            click: true,
        }
    }

    #[test]
    fn keys_map_to_actions() {
        let app = app(&["a/a"]);
        assert_eq!(app.handle_event(key('q')), Action::Quit);
        assert_eq!(app.handle_event(key('Q')), Action::Quit);
        assert_eq!(app.handle_event(key(' ')), Action::Refresh);
        assert_eq!(app.handle_event(key('s')), Action::CycleSort);
        assert_eq!(app.handle_event(key('S')), Action::CycleSort);
        assert_eq!(app.handle_event(key('x')), Action::None);
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(app.handle_event(ctrl_c), Action::Quit);
    }

    #[test]
    fn mouse_maps_to_pointer() {
        let app = app(&["a/a"]);
        let mouse = |kind| {
            Event::Mouse(MouseEvent {
                kind,
                column: 4,
                row: 7,
                modifiers: KeyModifiers::NONE,
            })
        };
        assert_eq!(
            app.handle_event(mouse(MouseEventKind::Moved)),
            Action::Pointer { column: 4, row: 7, click: false }
        );
        assert_eq!(
            app.handle_event(mouse(MouseEventKind::Down(MouseButton::Left))),
            Action::Pointer { column: 4, row: 7, click: true }
        );
        assert_eq!(
            app.handle_event(mouse(MouseEventKind::Down(MouseButton::Right))),
            Action::None
        );
    }

    #[tokio::test]
    async fn sort_cycles_back_to_discovery_order() {
        let mut app = app(&["c/c", "a/a", "b/b"]);
        let original = app.order.clone();

        app.update(Action::CycleSort).await;
        app.refresh_order();
        assert_eq!(app.sort_mode, SortMode::Alphabetical);
        assert_eq!(app.order, vec![1, 2, 0]);

        app.update(Action::CycleSort).await;
        app.refresh_order();
        assert_eq!(app.sort_mode, SortMode::ByStatus);

        app.update(Action::CycleSort).await;
        app.refresh_order();
        assert_eq!(app.sort_mode, SortMode::Default);
        assert_eq!(app.order, original);
    }

    #[tokio::test]
    async fn refresh_is_debounced() {
        let mut app = app(&["a/a", "b/b"]);
        let start = app.last_refresh;

        app.apply(Action::Refresh, start + Duration::from_millis(1500)).await;
        app.apply(Action::Refresh, start + Duration::from_millis(1900)).await;
        assert_eq!(app.rounds, 1);

        app.apply(Action::Refresh, start + Duration::from_millis(2600)).await;
        assert_eq!(app.rounds, 2);
        app.shutdown().await;
    }

    #[tokio::test]
    async fn refresh_right_after_start_is_ignored() {
        let mut app = app(&["a/a"]);
        let start = app.last_refresh;
        app.apply(Action::Refresh, start + Duration::from_millis(300)).await;
        assert_eq!(app.rounds, 0);
    }

    #[tokio::test]
    async fn slow_round_does_not_start_the_next_one() {
        let mut settings = settings("sleep 0.7; echo completed success");
        settings.poll_interval = Duration::from_secs(1);
        settings.max_concurrent = 1;
        let repos = vec!["a/a".to_string(), "b/b".to_string(), "c/c".to_string()];
        let mut app = App::new(repos, 1, &settings, CancellationToken::new());

        let before = Instant::now();
        app.start_round(before).await;
        let after = Instant::now();

        // admitting 3 queries one at a time outlasts the interval
        assert!(after.duration_since(before) > settings.poll_interval);
        assert!(!app.refresh_due(after));
        assert!(app.last_refresh >= after - Duration::from_millis(50));
        app.shutdown().await;
    }

    #[test]
    fn refresh_timer() {
        let app = app(&["a/a"]);
        let start = app.last_refresh;
        assert_eq!(app.seconds_until_refresh(start), 300);
        assert_eq!(app.seconds_until_refresh(start + Duration::from_secs(299)), 1);
        assert_eq!(app.seconds_until_refresh(start + Duration::from_secs(400)), 0);
        assert!(!app.refresh_due(start + Duration::from_secs(299)));
        assert!(app.refresh_due(start + Duration::from_secs(300)));
    }

    #[test]
    fn spinner_advances_on_interval() {
        let mut app = app(&["a/a"]);
        let start = app.last_spin;
        app.tick_spinner(start + Duration::from_millis(100));
        assert_eq!(app.spinner_index, 0);
        app.tick_spinner(start + Duration::from_millis(130));
        assert_eq!(app.spinner_index, 1);
        for i in 0..7 {
            app.tick_spinner(start + Duration::from_millis(130 + 125 * (i + 1)));
        }
        assert_eq!(app.spinner_index, 0);
    }

    #[tokio::test]
    async fn clicking_quit_button() {
        let mut app = app(&["a/a"]);
        let row = app.layout.footer_row;
        app.update(click(1, row)).await;
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn clicking_sort_button_cycles() {
        let mut app = app(&["a/a"]);
        let row = app.layout.footer_row;
        app.update(click(26, row)).await;
        assert_eq!(app.sort_mode, SortMode::Alphabetical);
        // a click elsewhere on the footer does nothing
        app.update(click(20, row)).await;
        assert_eq!(app.sort_mode, SortMode::Alphabetical);
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn clicking_refresh_button_is_debounced() {
        let mut app = app(&["a/a"]);
        let row = app.layout.footer_row;
        let start = app.last_refresh;
        app.apply(click(10, row), start + Duration::from_millis(200)).await;
        assert_eq!(app.rounds, 0);
        app.apply(click(10, row), start + Duration::from_secs(2)).await;
        assert_eq!(app.rounds, 1);
        app.shutdown().await;
    }

    #[tokio::test]
    async fn pointer_move_only_updates_tooltip() {
        let mut app = app(&["a/a", "b/b"]);
        app.statuses[1] = "in_progress null".to_string();
        let (x, y) = app.layout.cell_origin(1);

        app.update(Action::Pointer { column: x + 3, row: y, click: false }).await;

        assert_eq!(app.hover, Some((x + 3, y)));
        assert!(!app.should_quit);
        let counts = app.counts();
        assert_eq!(app.tooltip(&counts).as_deref(), Some("in progress null"));
    }

    #[test]
    fn tooltips_for_badges_and_buttons() {
        let mut app = app(&["a/a", "b/b"]);
        app.statuses = vec!["completed success".into(), "completed success".into()];
        app.relayout(Rect::new(0, 0, 100, 30));
        let counts = app.counts();

        let badge = app.layout.badges[0].1.start;
        app.hover = Some((badge, app.layout.stats_row));
        assert_eq!(app.tooltip(&counts).as_deref(), Some("Conclusion: success (2)"));

        app.hover = Some((0, app.layout.footer_row));
        assert_eq!(app.tooltip(&counts).as_deref(), Some("Quit application"));
        assert_eq!(app.display_state(Instant::now()).highlighted, Some(Command::Quit));

        app.hover = Some((0, 1));
        assert_eq!(app.tooltip(&counts), None);
    }

    #[test]
    fn display_state_follows_order() {
        let mut app = app(&["b/b", "a/a"]);
        app.statuses = vec!["completed failure".into(), LOADING.into()];
        app.sort_mode = SortMode::Alphabetical;
        app.refresh_order();

        let state = app.display_state(Instant::now());
        let names: Vec<&str> = state.cells.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["a/a", "b/b"]);
        assert_eq!(state.cells[1].1.icon, "❌");
        assert_eq!(app.counts().iter().sum::<usize>(), 2);
    }

    #[tokio::test]
    async fn rounds_fill_in_statuses() {
        let mut app = app(&["a/a", "b/b", "c/c"]);
        app.start_round(Instant::now()).await;
        for _ in 0..100 {
            app.collect().await;
            if app.statuses.iter().all(|s| s != LOADING) {
                break;
            }
        }
        assert!(app.statuses.iter().all(|s| s == "completed success"));
        app.shutdown().await;
    }
}

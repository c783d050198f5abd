use std::io::{self, Stdout};

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event as CrosstermEvent, EventStream,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::event::Event;

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

pub fn init() -> io::Result<Tui> {
    execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.hide_cursor()?;
    Ok(terminal)
}

pub fn restore() -> io::Result<()> {
    execute!(
        io::stdout(),
        DisableMouseCapture,
        LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    disable_raw_mode()
}

/// Receiving end of the input channel. Runs of pointer moves collapse into
/// the last one, so a key press never waits behind stale motion.
pub struct EventQueue {
    rx: mpsc::UnboundedReceiver<Event>,
    pending: Option<Event>,
}

impl EventQueue {
    pub fn new(rx: mpsc::UnboundedReceiver<Event>) -> Self {
        Self { rx, pending: None }
    }

    /// Next pending event, if any. Never waits.
    pub fn try_next(&mut self) -> Option<Event> {
        let mut event = self.pending.take().or_else(|| self.rx.try_recv().ok())?;
        while event.is_pointer_move() {
            match self.rx.try_recv() {
                Ok(next) if next.is_pointer_move() => event = next,
                Ok(next) => {
                    self.pending = Some(next);
                    break;
                }
                Err(_) => break,
            }
        }
        Some(event)
    }
}

/// Forwards terminal input from a background task. The event loop takes at
/// most one event per frame without waiting.
pub struct EventHandler {
    queue: EventQueue,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            let mut reader = EventStream::new();

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    Some(Ok(evt)) = reader.next() => {
                        let forwarded = match evt {
                            CrosstermEvent::Key(key) if key.kind == event::KeyEventKind::Press => {
                                Some(Event::Key(key))
                            }
                            CrosstermEvent::Mouse(mouse)
                                if !matches!(mouse.kind, MouseEventKind::ScrollUp | MouseEventKind::ScrollDown) =>
                            {
                                Some(Event::Mouse(mouse))
                            }
                            CrosstermEvent::Resize(_, _) => Some(Event::Resize),
                            _ => None,
                        };
                        if let Some(event) = forwarded {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self {
            queue: EventQueue::new(rx),
            cancel,
            task,
        }
    }

    pub fn try_next(&mut self) -> Option<Event> {
        self.queue.try_next()
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};

    fn moved(column: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind: MouseEventKind::Moved,
            column,
            row: 0,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn column(event: Option<Event>) -> Option<u16> {
        match event {
            Some(Event::Mouse(mouse)) => Some(mouse.column),
            _ => None,
        }
    }

    #[test]
    fn pointer_moves_collapse_to_latest() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut queue = EventQueue::new(rx);
        for x in 0..50 {
            tx.send(moved(x)).unwrap();
        }
        tx.send(Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)))
            .unwrap();

        assert_eq!(column(queue.try_next()), Some(49));
        assert!(matches!(
            queue.try_next(),
            Some(Event::Key(KeyEvent { code: KeyCode::Char('q'), .. }))
        ));
        assert!(queue.try_next().is_none());
    }

    #[test]
    fn keys_are_never_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut queue = EventQueue::new(rx);
        tx.send(Event::Key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE)))
            .unwrap();
        tx.send(moved(3)).unwrap();
        tx.send(Event::Key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE)))
            .unwrap();

        assert!(matches!(queue.try_next(), Some(Event::Key(_))));
        assert_eq!(column(queue.try_next()), Some(3));
        assert!(matches!(queue.try_next(), Some(Event::Key(_))));
        assert!(queue.try_next().is_none());
    }
}

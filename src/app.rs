// The central application controller and event loop.

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{Terminal, backend::Backend, widgets::TableState};
use std::time::{Duration, Instant};
use tracing::warn;

pub mod model;
pub mod runner;
pub mod systemd;
pub mod ui;

use model::{ServiceAction, ServiceRecord, Snapshot};
use runner::CommandRunner;
use systemd::Systemctl;

/// Outcome of the last operation, shown until the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Info(String),
    Error(String),
}

pub struct App<R> {
    systemctl: Systemctl<R>,
    snapshot: Snapshot,
    table_state: TableState,
    message: Option<Message>,
    refresh_interval: Option<Duration>,
    should_quit: bool,
}

impl<R: CommandRunner> App<R> {
    pub fn new(systemctl: Systemctl<R>) -> Self {
        let mut table_state = TableState::default();
        table_state.select(Some(0)); // Start with first item selected

        Self {
            systemctl,
            snapshot: Snapshot::new(),
            table_state,
            message: None,
            refresh_interval: None,
            should_quit: false,
        }
    }

    /// Re-read the snapshot periodically while running.
    pub fn with_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    pub fn selected(&self) -> Option<&ServiceRecord> {
        self.table_state
            .selected()
            .and_then(|index| self.snapshot.get(index))
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        // Initial fetch
        self.reload();

        let mut last_tick = Instant::now();
        let idle = Duration::from_secs(1);

        loop {
            terminal.draw(|f| {
                ui::render(
                    f,
                    &self.snapshot,
                    &mut self.table_state,
                    self.systemctl.scope(),
                    self.message.as_ref(),
                )
            })?;

            let timeout = match self.refresh_interval {
                Some(interval) => interval.saturating_sub(last_tick.elapsed()),
                None => idle,
            };

            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }

            if let Some(interval) = self.refresh_interval {
                if last_tick.elapsed() >= interval {
                    self.reload();
                    last_tick = Instant::now();
                }
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => {
                if self.message.take().is_none() {
                    self.should_quit = true;
                }
            }
            KeyCode::Char('j') | KeyCode::Down => self.next(),
            KeyCode::Char('k') | KeyCode::Up => self.previous(),

            KeyCode::Enter | KeyCode::Char(' ') => self.perform_action(ServiceAction::toggle_for),
            KeyCode::Char('s') => self.perform_action(|_| ServiceAction::Start),
            KeyCode::Char('x') => self.perform_action(|_| ServiceAction::Stop),
            KeyCode::Char('r') => self.perform_action(|_| ServiceAction::Restart),
            KeyCode::Char('R') => self.reload(),
            _ => {}
        }
    }

    /// Replaces the snapshot. On failure the previous snapshot stays and the
    /// error is shown.
    pub fn reload(&mut self) {
        let selected_name = self.selected().map(|r| r.name.clone());

        match self.systemctl.read_snapshot() {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                // Keep the cursor on the same unit if it is still listed.
                let index = selected_name
                    .and_then(|name| self.snapshot.position(&name))
                    .or(self.table_state.selected())
                    .map(|i| i.min(self.snapshot.len().saturating_sub(1)));
                self.table_state.select(index.or(Some(0)));
            }
            Err(e) => {
                warn!(error = %e, "Failed to read unit snapshot");
                self.message = Some(Message::Error(e.to_string()));
            }
        }
    }

    fn next(&mut self) {
        let i = match self.table_state.selected() {
            Some(i) => {
                if i >= self.snapshot.len().saturating_sub(1) {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    fn previous(&mut self) {
        let i = match self.table_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.snapshot.len().saturating_sub(1)
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    /// Dispatches by unit name and applies the refreshed record by name, so
    /// a reordered snapshot can never get the wrong row updated.
    fn perform_action(&mut self, choose: impl FnOnce(&ServiceRecord) -> ServiceAction) {
        let Some(record) = self.selected() else {
            return;
        };
        let name = record.name.clone();
        let action = choose(record);

        self.message = Some(match self.systemctl.dispatch_action(&name, action) {
            Ok(refreshed) => {
                self.snapshot.replace(refreshed);
                Message::Info(format!("{} {}", action.past_tense(), name))
            }
            Err(e) => Message::Error(e.to_string()),
        });
    }
}

use std::io::{self, Write};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use crossterm::cursor::{Hide, Show};
use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyCode, KeyEvent, KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use thiserror::Error;

use crate::entity::Entity;
use crate::error::DashboardError;
use crate::geometry::PixelSize;
use crate::render::AnsiRenderer;
use crate::runtime::pointer::PointerTranslator;
use crate::runtime::{Dashboard, DashboardEvent};

pub type DriverResult<T> = std::result::Result<T, CliDriverError>;

#[derive(Debug, Error)]
pub enum CliDriverError {
    #[error("dashboard error: {0}")]
    Dashboard(#[from] DashboardError),
    #[error("terminal error: {0}")]
    Terminal(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs a `Dashboard` in a raw-mode terminal with mouse capture. Entity
/// lists arriving on `updates` are applied between input events; `q`, `Esc`
/// or `Ctrl-C` quits.
pub struct CliDriver {
    dashboard: Dashboard,
    renderer: AnsiRenderer,
    pointer: PointerTranslator,
    updates: Receiver<Vec<Entity>>,
}

impl CliDriver {
    pub fn new(dashboard: Dashboard, updates: Receiver<Vec<Entity>>) -> Self {
        Self {
            dashboard,
            renderer: AnsiRenderer::with_default(),
            pointer: PointerTranslator::new(),
            updates,
        }
    }

    /// Hand the dashboard back, e.g. to inspect the final layout.
    pub fn into_dashboard(self) -> Dashboard {
        self.dashboard
    }

    pub fn run(mut self) -> DriverResult<Dashboard> {
        let mut stdout = io::stdout();
        self.enter(&mut stdout)?;
        let result = self.run_inner(&mut stdout);
        self.exit(&mut stdout);
        result.map(|()| self.dashboard)
    }

    fn run_inner(&mut self, stdout: &mut impl Write) -> DriverResult<()> {
        let (width, height) = terminal::size()?;
        self.dashboard
            .resize(PixelSize::new(f32::from(width), f32::from(height)));
        self.dashboard.paint(&mut self.renderer, stdout)?;

        loop {
            let mut dirty = self.drain_updates();

            if event::poll(POLL_INTERVAL)? {
                let raw = event::read()?;
                if is_quit(&raw) {
                    self.dashboard.cancel_active_drag();
                    break;
                }
                if let Event::Resize(..) = raw {
                    execute!(stdout, Clear(ClearType::All))?;
                    self.renderer.invalidate();
                }
                if let Some(gesture) = self.pointer.translate(&raw, &self.dashboard) {
                    self.dashboard.handle(gesture);
                    dirty = true;
                }
            }

            if dirty {
                self.dashboard.paint(&mut self.renderer, stdout)?;
            }
        }
        self.dashboard.emit_metrics();
        Ok(())
    }

    /// Apply every pending entity list in arrival order.
    fn drain_updates(&mut self) -> bool {
        let mut applied = false;
        loop {
            match self.updates.try_recv() {
                Ok(entities) => {
                    self.dashboard
                        .handle(DashboardEvent::EntitiesUpdated(entities));
                    applied = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return applied,
            }
        }
    }

    fn enter(&self, stdout: &mut impl Write) -> DriverResult<()> {
        terminal::enable_raw_mode().map_err(|err| CliDriverError::Terminal(err.to_string()))?;
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableMouseCapture,
            EnableFocusChange,
            Hide,
            Clear(ClearType::All)
        )?;
        Ok(())
    }

    fn exit(&self, stdout: &mut impl Write) {
        execute!(stdout, DisableFocusChange, DisableMouseCapture, Show, LeaveAlternateScreen).ok();
        terminal::disable_raw_mode().ok();
    }
}

fn is_quit(event: &Event) -> bool {
    match event {
        Event::Key(KeyEvent {
            code, modifiers, ..
        }) => {
            matches!(code, KeyCode::Char('q') | KeyCode::Esc)
                || (*code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL))
        }
        _ => false,
    }
}

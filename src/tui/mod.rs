//! Live queue view
//!
//! A full-screen, self-refreshing view over `squeue`:
//! - the snapshot is re-fetched on a timer or on `r`
//! - a fixed window of rows scrolls over the snapshot
//! - the terminal is restored on every exit path, including interrupts

pub mod event;
pub mod runtime;
pub mod state;
pub mod theme;
pub mod ui;

use std::io::{self, IsTerminal, stdout};
use std::time::Duration;

use anyhow::{Result, bail};
use chrono::Local;
use crossterm::{
    event::EventStream,
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::models::QueueConfig;
use crate::queue::{QueueScope, SlurmQueue};
use crate::slurm::SlurmCommands;
use crate::tui::runtime::{ViewerExit, ViewerTiming, run_event_loop};
use crate::tui::state::ViewerState;
use crate::tui::theme::Theme;
use crate::tui::ui::{CLOCK_FORMAT, HeaderInfo};

/// Terminal capability requirements for the live view
#[derive(Debug)]
pub struct TerminalCapabilities {
    pub is_tty: bool,
    pub term_type: String,
    pub supports_alternate_screen: bool,
}

impl TerminalCapabilities {
    /// Detect terminal capabilities
    pub fn detect() -> Self {
        let term_type = std::env::var("TERM").unwrap_or_default();
        Self::from_parts(stdout().is_terminal(), term_type)
    }

    fn from_parts(is_tty: bool, term_type: String) -> Self {
        let supports_alternate_screen = !matches!(term_type.as_str(), "dumb" | "" | "unknown");
        Self {
            is_tty,
            term_type,
            supports_alternate_screen,
        }
    }

    pub fn is_suitable(&self) -> bool {
        self.is_tty && self.supports_alternate_screen
    }

    /// Get error message for unsuitable terminal
    pub fn error_message(&self) -> String {
        if !self.is_tty {
            "The live queue view requires an interactive terminal (stdout is not a TTY).\n\
             Hint: Run 'slurmtools queue' without --view for a single snapshot."
                .to_string()
        } else if !self.supports_alternate_screen {
            format!(
                "Terminal type '{}' may not support the live queue view.\n\
                 Hint: Set TERM to a supported value (e.g., xterm-256color).",
                if self.term_type.is_empty() {
                    "(unset)"
                } else {
                    &self.term_type
                }
            )
        } else {
            "Unknown terminal capability issue.".to_string()
        }
    }
}

/// Settings of one viewer session
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub scope: QueueScope,
    pub refresh_interval: Duration,
    pub window: usize,
    pub scroll_step: usize,
    pub theme: Theme,
}

impl ViewerOptions {
    /// Options from the `[queue]` config section; a command-line refresh
    /// interval wins over the configured one
    pub fn from_config(config: &QueueConfig, scope: QueueScope, refresh_secs: Option<u64>) -> Self {
        let secs = refresh_secs.unwrap_or(config.refresh_interval).max(1);
        Self {
            scope,
            refresh_interval: Duration::from_secs(secs),
            window: config.window_size,
            scroll_step: config.scroll_step,
            theme: Theme::from_name(&config.theme),
        }
    }
}

/// Raw mode and alternate screen, released on drop
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn acquire() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }
        let terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => terminal,
            Err(e) => {
                let _ = disable_raw_mode();
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                return Err(e.into());
            }
        };
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            tracing::warn!("Failed to leave raw mode: {}", e);
        }
        if let Err(e) = execute!(self.terminal.backend_mut(), LeaveAlternateScreen) {
            tracing::warn!("Failed to leave alternate screen: {}", e);
        }
        let _ = self.terminal.show_cursor();
    }
}

/// Run the live view until the user quits or interrupts it.
///
/// The first snapshot is taken after the screen is set up; if it fails the
/// terminal is restored and the error returned.
pub fn run_viewer(slurm: &dyn SlurmCommands, options: ViewerOptions) -> Result<ViewerExit> {
    let capabilities = TerminalCapabilities::detect();
    if !capabilities.is_suitable() {
        bail!("{}", capabilities.error_message());
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let cancel = CancellationToken::new();
        let signal_cancel = cancel.clone();
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signal_cancel.cancel();
            }
        });

        let header = HeaderInfo {
            owner_label: options.scope.owner_label(slurm.current_user()),
        };
        let timing = ViewerTiming::new(options.refresh_interval);
        let mut state = ViewerState::new(options.window, options.scroll_step);
        let mut source = SlurmQueue::new(slurm);

        let mut guard = TerminalGuard::acquire()?;
        let result = run_event_loop(
            &mut state,
            &mut source,
            options.scope,
            timing,
            EventStream::new(),
            cancel,
            |state| {
                let clock = Local::now().format(CLOCK_FORMAT).to_string();
                guard
                    .terminal
                    .draw(|frame| ui::render(frame, state, &header, &clock, &options.theme))?;
                Ok(())
            },
        )
        .await;

        drop(guard);
        signal_task.abort();

        if let Ok(exit) = &result {
            tracing::debug!(?exit, "live queue view closed");
        }
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_require_tty() {
        let caps = TerminalCapabilities::from_parts(false, "xterm-256color".to_string());
        assert!(!caps.is_suitable());
        assert!(caps.error_message().contains("not a TTY"));
    }

    #[test]
    fn test_capabilities_reject_dumb_terminal() {
        let caps = TerminalCapabilities::from_parts(true, "dumb".to_string());
        assert!(!caps.is_suitable());
        assert!(caps.error_message().contains("'dumb'"));

        let caps = TerminalCapabilities::from_parts(true, String::new());
        assert!(caps.error_message().contains("(unset)"));
    }

    #[test]
    fn test_capabilities_accept_xterm() {
        assert!(TerminalCapabilities::from_parts(true, "xterm-256color".to_string()).is_suitable());
    }

    #[test]
    fn test_viewer_options_from_config() {
        let config = QueueConfig {
            refresh_interval: 7,
            window_size: 12,
            scroll_step: 2,
            theme: "light".to_string(),
            ..QueueConfig::default()
        };

        let options = ViewerOptions::from_config(&config, QueueScope::All, None);
        assert_eq!(options.refresh_interval, Duration::from_secs(7));
        assert_eq!(options.window, 12);
        assert_eq!(options.scroll_step, 2);
        assert_eq!(options.theme.name, theme::ThemeName::Light);

        // Command line wins, but never below one second
        let options = ViewerOptions::from_config(&config, QueueScope::Mine, Some(0));
        assert_eq!(options.refresh_interval, Duration::from_secs(1));
    }
}

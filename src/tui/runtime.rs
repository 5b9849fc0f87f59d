//! Event loop of the live queue view
//!
//! One cooperative loop multiplexes three sources with `tokio::select!`,
//! biased in this order:
//! - cancellation (Ctrl+C delivered as a signal)
//! - terminal input, which is never starved by the timer
//! - a short ticker that redraws the clock and fires due refreshes
//!
//! Snapshots are fetched inline. A hanging `squeue` therefore hangs the
//! view until the user interrupts it.

use std::io;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::Event;
use futures::{Stream, StreamExt};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::queue::{QueueScope, SnapshotSource};
use crate::tui::event::KeyAction;
use crate::tui::state::{EventResult, ViewerState};

/// Clock redraw and refresh check period
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);

/// How the viewer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerExit {
    /// Quit key or end of the input stream
    Quit,
    /// Ctrl+C, a signal, or a lost terminal
    Interrupted,
}

/// Loop timing
#[derive(Debug, Clone, Copy)]
pub struct ViewerTiming {
    pub refresh_interval: Duration,
    pub tick: Duration,
}

impl ViewerTiming {
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            refresh_interval,
            tick: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// Terminal errors after which no further input can arrive
fn is_fatal_terminal_error(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset | io::ErrorKind::UnexpectedEof
    )
}

/// Fetch a new snapshot. A failure keeps the previous buffer on screen.
fn refresh<S>(state: &mut ViewerState, source: &mut S, scope: QueueScope)
where
    S: SnapshotSource + ?Sized,
{
    match source.fetch(scope) {
        Ok(lines) => {
            tracing::debug!(lines = lines.len(), "queue snapshot refreshed");
            state.replace_lines(lines, Instant::now());
        }
        Err(e) => {
            tracing::warn!("Queue refresh failed: {}", e);
            state.record_refresh_error(e.to_string(), Instant::now());
        }
    }
}

/// Run the viewer until quit, interrupt or cancellation.
///
/// The first snapshot must succeed; its error is returned before anything
/// is drawn. Later refresh failures are shown in the footer instead.
pub async fn run_event_loop<S, E>(
    state: &mut ViewerState,
    source: &mut S,
    scope: QueueScope,
    timing: ViewerTiming,
    mut events: E,
    cancel: CancellationToken,
    mut render_fn: impl FnMut(&ViewerState) -> Result<()>,
) -> Result<ViewerExit>
where
    S: SnapshotSource + ?Sized,
    E: Stream<Item = io::Result<Event>> + Unpin,
{
    let lines = source.fetch(scope)?;
    state.replace_lines(lines, Instant::now());

    let mut ticker = tokio::time::interval(timing.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut needs_render = true;

    loop {
        if needs_render {
            render_fn(&*state)?;
            needs_render = false;
        }

        tokio::select! {
            biased;

            _ = cancel.cancelled() => return Ok(ViewerExit::Interrupted),

            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => match KeyAction::from_key_event(key).apply(state) {
                    EventResult::Continue => needs_render = true,
                    EventResult::Unchanged => {}
                    EventResult::Refresh => {
                        refresh(state, source, scope);
                        needs_render = true;
                    }
                    EventResult::Quit => return Ok(ViewerExit::Quit),
                    EventResult::Interrupted => return Ok(ViewerExit::Interrupted),
                },
                Some(Ok(Event::Resize(..))) => needs_render = true,
                Some(Ok(_)) => {}
                Some(Err(e)) if is_fatal_terminal_error(&e) => {
                    tracing::info!("Terminal disconnected: {:?}", e);
                    return Ok(ViewerExit::Interrupted);
                }
                Some(Err(e)) => tracing::warn!("Terminal event read error: {:?}", e),
                None => return Ok(ViewerExit::Quit),
            },

            _ = ticker.tick() => {
                if state.refresh_due(Instant::now(), timing.refresh_interval) {
                    refresh(state, source, scope);
                }
                // The clock in the header moves every tick
                needs_render = true;
            }
        }
    }
}

//! Scroll and buffer state of the live queue view.
//!
//! The line buffer is only ever replaced as a whole. After every buffer
//! replacement and every scroll command the offset is clamped to
//! `[0, max(0, len - window)]`.

use std::time::{Duration, Instant};

/// What the loop should do after a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Continue running, UI needs redraw
    Continue,
    /// Continue running, no UI change needed
    Unchanged,
    /// Fetch a new snapshot now
    Refresh,
    /// Leave the viewer
    Quit,
    /// Leave the viewer because of an interrupt
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct ViewerState {
    lines: Vec<String>,
    offset: usize,
    window: usize,
    scroll_step: usize,
    last_refresh: Option<Instant>,
    refresh_error: Option<String>,
}

impl ViewerState {
    /// A window of `window` rows (at least one) scrolling `scroll_step`
    /// rows per key press
    #[must_use]
    pub fn new(window: usize, scroll_step: usize) -> Self {
        Self {
            lines: Vec::new(),
            offset: 0,
            window: window.max(1),
            scroll_step: scroll_step.max(1),
            last_refresh: None,
            refresh_error: None,
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Largest valid offset for the current buffer
    #[must_use]
    pub fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.window)
    }

    /// Error of the most recent refresh, if it failed
    #[must_use]
    pub fn refresh_error(&self) -> Option<&str> {
        self.refresh_error.as_deref()
    }

    fn clamp(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }

    /// Swap in a new snapshot and re-clamp the offset
    pub fn replace_lines(&mut self, lines: Vec<String>, at: Instant) {
        self.lines = lines;
        self.last_refresh = Some(at);
        self.refresh_error = None;
        self.clamp();
    }

    /// Remember a failed refresh; the previous buffer stays in place
    pub fn record_refresh_error(&mut self, message: impl Into<String>, at: Instant) {
        self.last_refresh = Some(at);
        self.refresh_error = Some(message.into());
    }

    /// True when no snapshot has been taken yet or `interval` has elapsed
    #[must_use]
    pub fn refresh_due(&self, now: Instant, interval: Duration) -> bool {
        match self.last_refresh {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= interval,
        }
    }

    pub fn scroll_up(&mut self) {
        self.offset = self.offset.saturating_sub(self.scroll_step);
        self.clamp();
    }

    pub fn scroll_down(&mut self) {
        self.offset = self.offset.saturating_add(self.scroll_step);
        self.clamp();
    }

    fn page(&self) -> usize {
        (self.window / 2).max(1)
    }

    pub fn page_up(&mut self) {
        self.offset = self.offset.saturating_sub(self.page());
        self.clamp();
    }

    pub fn page_down(&mut self) {
        self.offset = self.offset.saturating_add(self.page());
        self.clamp();
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    /// Exactly `window` rows: the visible slice of the buffer, padded with
    /// empty rows when the buffer is shorter than the window
    #[must_use]
    pub fn visible_rows(&self) -> Vec<&str> {
        let end = (self.offset + self.window).min(self.lines.len());
        let mut rows: Vec<&str> = self.lines[self.offset..end]
            .iter()
            .map(String::as_str)
            .collect();
        rows.resize(self.window, "");
        rows
    }
}

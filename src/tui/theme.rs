//! Palettes of the live queue view, selected by `queue.theme`.
//!
//! Queue rows are tinted by the state column, so the state colors avoid
//! red/green as the only distinction.

use ratatui::style::Color;

use crate::models::JobState;

/// Available theme names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
}

impl ThemeName {
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "light" => ThemeName::Light,
            _ => ThemeName::Dark,
        }
    }
}

/// Color theme for the viewer
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemeName,

    pub fg: Color,
    pub rule: Color,

    // Header
    pub owner: Color,
    pub clock: Color,
    pub hint: Color,
    pub column_header: Color,

    // Job state colors (colorblind-safe)
    pub running: Color,
    pub pending: Color,
    pub completed: Color,
    pub failed: Color,
    pub cancelled: Color,
    pub timeout: Color,

    // Footer
    pub status: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Create a dark theme (default)
    pub fn dark() -> Self {
        Self {
            name: ThemeName::Dark,

            fg: Color::White,
            rule: Color::DarkGray,

            owner: Color::Rgb(0, 200, 0),
            clock: Color::Cyan,
            hint: Color::Gray,
            column_header: Color::White,

            running: Color::Rgb(0, 200, 0),      // Bright green
            pending: Color::Rgb(255, 180, 0),    // Orange (not yellow - better visibility)
            completed: Color::Rgb(80, 160, 255), // Light blue
            failed: Color::Rgb(255, 80, 80),     // Bright red
            cancelled: Color::DarkGray,
            timeout: Color::Magenta,

            status: Color::Gray,
            error: Color::Rgb(255, 100, 100),
        }
    }

    /// Darker variants of the dark palette for light backgrounds
    pub fn light() -> Self {
        Self {
            name: ThemeName::Light,

            fg: Color::Black,
            rule: Color::Rgb(120, 120, 120),

            owner: Color::Rgb(0, 140, 0),
            clock: Color::Rgb(0, 100, 180),
            hint: Color::Rgb(100, 100, 100),
            column_header: Color::Black,

            running: Color::Rgb(0, 140, 0),       // Dark green
            pending: Color::Rgb(200, 120, 0),     // Dark orange
            completed: Color::Rgb(0, 80, 180),    // Dark blue
            failed: Color::Rgb(200, 0, 0),        // Dark red
            cancelled: Color::Rgb(100, 100, 100), // Medium gray
            timeout: Color::Rgb(160, 0, 160),     // Dark magenta

            status: Color::Rgb(100, 100, 100),
            error: Color::Rgb(200, 0, 0),
        }
    }

    /// Unknown names fall back to the dark palette
    pub fn from_name(name: &str) -> Self {
        match ThemeName::from_name(name) {
            ThemeName::Dark => Self::dark(),
            ThemeName::Light => Self::light(),
        }
    }

    /// Get color for a job state
    pub fn job_state_color(&self, state: &JobState) -> Color {
        match state {
            JobState::Running | JobState::Completing | JobState::Configuring => self.running,
            JobState::Pending | JobState::Suspended => self.pending,
            JobState::Completed => self.completed,
            JobState::Failed
            | JobState::OutOfMemory
            | JobState::NodeFail
            | JobState::BootFail => self.failed,
            JobState::Cancelled | JobState::Preempted => self.cancelled,
            JobState::Timeout | JobState::Deadline => self.timeout,
            JobState::Unknown(_) => self.fg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_from_name() {
        assert_eq!(Theme::from_name("dark").name, ThemeName::Dark);
        assert_eq!(Theme::from_name("Light").name, ThemeName::Light);
        // Unknown defaults to dark
        assert_eq!(Theme::from_name("solarized").name, ThemeName::Dark);
    }

    #[test]
    fn test_job_state_colors() {
        let theme = Theme::dark();
        assert_eq!(theme.job_state_color(&JobState::Running), theme.running);
        assert_eq!(theme.job_state_color(&JobState::Pending), theme.pending);
        assert_eq!(theme.job_state_color(&JobState::Failed), theme.failed);
        assert_eq!(theme.job_state_color(&JobState::Unknown("X".into())), theme.fg);
    }
}

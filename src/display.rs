// ABOUTME: Terminal progress bar for tracked analysis jobs
// ABOUTME: Renders poller updates with colours picked from the resolved theme

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::progress::ProgressUpdate;
use crate::theme::Theme;

const DARK_TEMPLATE: &str = "{spinner:.cyan} [{bar:40.cyan/blue}] {pos:>3}% {msg}";
const LIGHT_TEMPLATE: &str = "{spinner:.blue} [{bar:40.blue/black}] {pos:>3}% {msg}";

pub struct ProgressDisplay {
    bar: ProgressBar,
}

impl ProgressDisplay {
    pub fn new(theme: Theme) -> Result<Self> {
        Self::with_bar(ProgressBar::new(100), theme)
    }

    #[cfg(test)]
    fn hidden(theme: Theme) -> Result<Self> {
        Self::with_bar(ProgressBar::hidden(), theme)
    }

    fn with_bar(bar: ProgressBar, theme: Theme) -> Result<Self> {
        let template = match theme {
            Theme::Dark => DARK_TEMPLATE,
            Theme::Light => LIGHT_TEMPLATE,
        };
        let style = ProgressStyle::with_template(template)
            .context("Invalid progress bar template")?
            .progress_chars("#>-");
        bar.set_style(style);
        bar.set_message("Analyzing");
        Ok(Self { bar })
    }

    pub fn apply(&self, update: &ProgressUpdate) {
        self.bar.set_position(u64::from(update.percent()));
        match update {
            ProgressUpdate::Reported { status, .. } => match status.as_deref() {
                Some(status) => self.bar.set_message(format!("Analyzing ({})", status)),
                None => self.bar.set_message("Analyzing"),
            },
            ProgressUpdate::Degraded { .. } => {
                self.bar.set_message("Waiting for server, retrying");
            }
            ProgressUpdate::Complete { .. } => {
                self.bar.finish_with_message("Analysis complete");
            }
        }
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Leave the bar where it is with a final message.
    pub fn abandon(&self, message: &'static str) {
        self.bar.abandon_with_message(message);
    }

    /// Print a line without tearing the bar.
    pub fn println(&self, message: impl AsRef<str>) {
        self.bar.println(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_templates_are_valid() {
        assert!(ProgressDisplay::hidden(Theme::Dark).is_ok());
        assert!(ProgressDisplay::hidden(Theme::Light).is_ok());
    }

    #[test]
    fn test_position_tracks_updates() {
        let display = ProgressDisplay::hidden(Theme::Light).unwrap();

        display.apply(&ProgressUpdate::Degraded {
            percent: 5,
            error: "timeout".to_string(),
        });
        assert_eq!(display.position(), 5);

        display.apply(&ProgressUpdate::Reported {
            percent: 30,
            status: Some("processing".to_string()),
        });
        assert_eq!(display.position(), 30);

        display.apply(&ProgressUpdate::Complete {
            xray_id: "99".to_string(),
        });
        assert_eq!(display.position(), 100);
    }
}

// ABOUTME: Light/dark theme preference with explicit precedence rules
// ABOUTME: Persists the chosen preference to a TOML settings file

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Theme implied by a `COLORFGBG` value such as `"15;0"`.
    ///
    /// The last field is the background colour index; the standard dark
    /// indices (0-6 and 8) mean a dark terminal. Anything else is light.
    pub fn from_colorfgbg(value: Option<&str>) -> Theme {
        let background = value
            .and_then(|v| v.rsplit(';').next())
            .and_then(|bg| bg.trim().parse::<u8>().ok());

        match background {
            Some(0..=6) | Some(8) => Theme::Dark,
            _ => Theme::Light,
        }
    }

    /// Best guess at the terminal's own scheme.
    pub fn system() -> Theme {
        Theme::from_colorfgbg(std::env::var("COLORFGBG").ok().as_deref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    /// Follow the system scheme.
    #[default]
    Auto,
    Light,
    Dark,
}

impl ThemePreference {
    pub const ALL: [ThemePreference; 3] = [
        ThemePreference::Auto,
        ThemePreference::Light,
        ThemePreference::Dark,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemePreference::Auto => "auto",
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
        }
    }

    fn fixed(self) -> Option<Theme> {
        match self {
            ThemePreference::Auto => None,
            ThemePreference::Light => Some(Theme::Light),
            ThemePreference::Dark => Some(Theme::Dark),
        }
    }
}

impl From<Theme> for ThemePreference {
    fn from(theme: Theme) -> Self {
        match theme {
            Theme::Light => ThemePreference::Light,
            Theme::Dark => ThemePreference::Dark,
        }
    }
}

/// Explicit preference, then stored preference, then the system scheme.
/// `Auto` at either level defers to the next one.
pub fn resolve(
    explicit: Option<ThemePreference>,
    stored: Option<ThemePreference>,
    system: Theme,
) -> Theme {
    explicit
        .and_then(ThemePreference::fixed)
        .or_else(|| stored.and_then(ThemePreference::fixed))
        .unwrap_or(system)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    theme: Option<ThemePreference>,
}

pub struct ThemeStore {
    path: PathBuf,
}

impl ThemeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/xray-progress/settings.toml`
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir().context("Could not determine the user config directory")?;
        Ok(Self::new(dir.join("xray-progress").join("settings.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored preference, or `None` if nothing has been saved yet.
    pub fn load(&self) -> Result<Option<ThemePreference>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read settings from {}", self.path.display())
                })
            }
        };

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", self.path.display()))?;

        Ok(settings.theme)
    }

    pub fn save(&self, preference: ThemePreference) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }

        let settings = Settings {
            theme: Some(preference),
        };
        let contents = toml::to_string(&settings).context("Failed to serialize settings")?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), theme = preference.as_str(), "Saved theme preference");
        Ok(())
    }

    /// Flip the currently resolved theme and store the result.
    pub fn toggle(&self, explicit: Option<ThemePreference>, system: Theme) -> Result<Theme> {
        let current = resolve(explicit, self.load()?, system);
        let next = current.toggled();
        self.save(next.into())?;
        Ok(next)
    }
}

//! Display preferences kept in the key-value store.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use criticart_cache::{CacheError, KeyValueStore};
use tracing::debug;

pub const THEME_KEY: &str = "theme";

/// Color theme of the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme: {}", other)),
        }
    }
}

/// Reads and writes user preferences.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored theme; light when unset or unrecognized.
    pub fn theme(&self) -> Result<Theme, CacheError> {
        Ok(self
            .store
            .get(THEME_KEY)?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default())
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), CacheError> {
        debug!(theme = theme.as_str(), "saving theme");
        self.store.set(THEME_KEY, theme.as_str())
    }

    /// Flip the theme and persist it. Returns the new theme.
    pub fn toggle_theme(&self) -> Result<Theme, CacheError> {
        let next = self.theme()?.toggled();
        self.set_theme(next)?;
        Ok(next)
    }
}

use std::fmt;

use tracing::info;

use crate::storage::Persistence;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn storage_value(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn from_storage(raw: &str) -> Option<Self> {
        match raw.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
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
        f.write_str(self.storage_value())
    }
}

/// Light/dark preference, persisted on its own key and independent of the
/// task store.
pub struct ThemeController {
    current: Theme,
    persistence: Persistence,
}

impl ThemeController {
    pub fn load(persistence: Persistence) -> anyhow::Result<Self> {
        let current = persistence.load_theme()?;
        Ok(Self {
            current,
            persistence,
        })
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    pub fn is_dark(&self) -> bool {
        self.current == Theme::Dark
    }

    #[tracing::instrument(skip(self), fields(from = %self.current))]
    pub fn toggle(&mut self) -> anyhow::Result<Theme> {
        self.current = self.current.toggled();
        self.persistence.save_theme(self.current)?;
        info!(theme = %self.current, "theme toggled");
        Ok(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::{Theme, ThemeController};
    use crate::storage::Persistence;

    #[test]
    fn toggle_flips_and_persists() {
        let persistence = Persistence::in_memory();
        let mut themes = ThemeController::load(persistence.clone()).expect("load");
        assert!(!themes.is_dark());

        assert_eq!(themes.toggle().expect("toggle"), Theme::Dark);
        assert_eq!(persistence.load_theme().expect("reload"), Theme::Dark);

        assert_eq!(themes.toggle().expect("toggle"), Theme::Light);
        assert_eq!(persistence.load_theme().expect("reload"), Theme::Light);
    }

    #[test]
    fn restores_saved_preference() {
        let persistence = Persistence::in_memory();
        persistence.save_theme(Theme::Dark).expect("save");

        let themes = ThemeController::load(persistence).expect("load");
        assert_eq!(themes.current(), Theme::Dark);
    }
}

//! Reader settings, persisted as metadata entries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::observable::{Observable, Subscription};
use crate::storage::{keys, LocalStore};

pub const DEFAULT_FONT_SIZE_SCALE: i32 = 2;
pub const MAX_FONT_SIZE_SCALE: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub keep_screen_on: bool,
    pub night_mode_on: bool,
    pub font_size_scale: i32,
    pub simple_reading_mode_on: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keep_screen_on: true,
            night_mode_on: false,
            font_size_scale: DEFAULT_FONT_SIZE_SCALE,
            simple_reading_mode_on: false,
        }
    }
}

impl Settings {
    fn from_metadata(values: &HashMap<String, String>) -> Self {
        let defaults = Settings::default();
        let flag = |key: &str, default: bool| {
            values
                .get(key)
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(default)
        };
        let font_size_scale = values
            .get(keys::FONT_SIZE_SCALE)
            .and_then(|v| v.parse::<i32>().ok())
            .filter(|scale| (0..=MAX_FONT_SIZE_SCALE).contains(scale))
            .unwrap_or(defaults.font_size_scale);

        Self {
            keep_screen_on: flag(keys::KEEP_SCREEN_ON, defaults.keep_screen_on),
            night_mode_on: flag(keys::NIGHT_MODE_ON, defaults.night_mode_on),
            font_size_scale,
            simple_reading_mode_on: flag(keys::SIMPLE_READING_MODE_ON, defaults.simple_reading_mode_on),
        }
    }

    fn to_metadata(self) -> Vec<(&'static str, String)> {
        vec![
            (keys::KEEP_SCREEN_ON, self.keep_screen_on.to_string()),
            (keys::NIGHT_MODE_ON, self.night_mode_on.to_string()),
            (keys::FONT_SIZE_SCALE, self.font_size_scale.to_string()),
            (keys::SIMPLE_READING_MODE_ON, self.simple_reading_mode_on.to_string()),
        ]
    }
}

#[derive(Clone, Debug)]
pub struct SettingsManager {
    store: LocalStore,
    settings: Observable<Settings>,
}

impl SettingsManager {
    /// Never fails: unreadable settings fall back to the defaults.
    pub async fn load(store: LocalStore) -> Self {
        let settings = match store
            .read_metadata_many(&[
                (keys::KEEP_SCREEN_ON, ""),
                (keys::NIGHT_MODE_ON, ""),
                (keys::FONT_SIZE_SCALE, ""),
                (keys::SIMPLE_READING_MODE_ON, ""),
            ])
            .await
        {
            Ok(values) => Settings::from_metadata(&values),
            Err(e) => {
                tracing::error!("[Settings] Failed to read settings: {}", e);
                Settings::default()
            }
        };

        Self {
            store,
            settings: Observable::new(settings),
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings.get()
    }

    pub fn observe_settings(&self) -> Subscription<Settings> {
        self.settings.subscribe()
    }

    pub async fn save_settings(&self, settings: Settings) -> Result<()> {
        if self.settings.get() == settings {
            return Ok(());
        }
        self.store.save_metadata_many(settings.to_metadata()).await?;
        self.settings.set(settings);
        tracing::debug!("[Settings] Saved {:?}", settings);
        Ok(())
    }
}

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
    time::Duration,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    pub sample_interval_ms: u64,
    pub raw_precision: usize,
    pub fused_precision: usize,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            sample_interval_ms: 100,
            raw_precision: 4,
            fused_precision: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub window_days: u32,
    pub query_timeout_secs: u64,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            window_days: 30,
            query_timeout_secs: 15,
        }
    }
}

impl HistorySettings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub motion: MotionSettings,
    pub history: HistorySettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`. A missing or unreadable file yields the
    /// defaults; nothing is written until the first update.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings at {}: {err}", path.display());
                AppSettings::default()
            })
        } else {
            AppSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> AppSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn motion(&self) -> MotionSettings {
        self.current().motion
    }

    pub fn history(&self) -> HistorySettings {
        self.current().history
    }

    pub fn update_motion(&self, settings: MotionSettings) -> Result<()> {
        self.update(|data| data.motion = settings)
    }

    pub fn update_history(&self, settings: HistorySettings) -> Result<()> {
        self.update(|data| data.history = settings)
    }

    fn update(&self, apply: impl FnOnce(&mut AppSettings)) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut *guard);
        self.persist(&guard)
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

pub mod db;
mod demo;
pub mod error;
pub mod health;
pub mod motion;
pub mod settings;
mod utils;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use db::Database;
use health::{Clock, HealthStore, SqliteHealthService, SystemClock};
use log::info;
use motion::{MotionController, MotionProvider, SourceConfig};
use settings::SettingsStore;

pub use demo::DemoOptions;

/// Everything the screens of the app read from.
pub struct App {
    pub settings: SettingsStore,
    pub db: Database,
    pub health: HealthStore,
    pub raw_motion: MotionController,
    pub device_motion: MotionController,
}

impl App {
    pub fn open(data_dir: &Path, provider: Arc<dyn MotionProvider>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let database = Database::new(data_dir.join("motionstat.sqlite3"))?;

        let service = Arc::new(SqliteHealthService::new(database.clone()));
        let health = HealthStore::new(service.clone(), service, settings.history());

        let config = SourceConfig::from(&settings.motion());
        let raw_motion = MotionController::raw_sensors(provider.clone(), config);
        let device_motion = MotionController::device_motion(provider, config);

        Ok(Self {
            settings,
            db: database,
            health,
            raw_motion,
            device_motion,
        })
    }

    /// Fills an empty store with demo samples so the history screens have
    /// something to show. Returns how many samples were written.
    pub async fn seed_if_empty(&self) -> Result<usize> {
        if self.db.count_samples().await? > 0 {
            return Ok(0);
        }
        let days = self.settings.history().window_days;
        let written = self
            .db
            .seed_demo_samples(SystemClock.now(), days)
            .await
            .context("failed to seed demo samples")?;
        info!("Seeded {written} demo samples over {days} days");
        Ok(written)
    }
}

pub fn run() -> Result<()> {
    // RUST_LOG overrides the default level.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("motionstat starting up...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(demo::run_demo(DemoOptions::from_env()))
}

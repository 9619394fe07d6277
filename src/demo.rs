use std::{
    env,
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;
use log::{error, info, warn};
use tokio::time::{Instant, MissedTickBehavior};

use crate::health::HealthStore;
use crate::motion::{Availability, Feed, MotionController, SimulatedMotionProvider};
use crate::App;

const DEFAULT_DATA_DIR: &str = ".motionstat";
const DEFAULT_STREAM_SECS: u64 = 3;

#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub data_dir: PathBuf,
    pub stream_for: Duration,
    pub print_every: Duration,
}

impl DemoOptions {
    pub fn from_env() -> Self {
        let data_dir = env::var_os("MOTIONSTAT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let stream_secs = env::var("MOTIONSTAT_DEMO_SECS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_STREAM_SECS);
        let debug_mode = env::var("MOTIONSTAT_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            data_dir,
            stream_for: Duration::from_secs(stream_secs),
            print_every: if debug_mode {
                Duration::from_millis(200)
            } else {
                Duration::from_secs(1)
            },
        }
    }
}

pub async fn run_demo(options: DemoOptions) -> Result<()> {
    let provider = Arc::new(SimulatedMotionProvider::new()?);
    let app = App::open(&options.data_dir, provider)?;
    app.seed_if_empty().await?;

    show_history(&app.health).await;
    stream_motion(&app, &options).await;

    Ok(())
}

async fn show_history(health: &HealthStore) {
    if let Err(err) = health.request_authorization().await {
        error!("skipping history: {err}");
        return;
    }

    match health.calculate_steps().await {
        Ok(steps) => {
            println!("Steps ({} days)", steps.len());
            for step in &steps {
                println!("  {:<14}{:>14}", step.display_date(), step.display_value());
            }
        }
        Err(err) => error!("failed to load steps: {err}"),
    }

    match health.calculate_calories().await {
        Ok(calories) => {
            println!("Calories ({} days)", calories.len());
            for calorie in &calories {
                println!(
                    "  {:<14}{:>14}",
                    calorie.display_date(),
                    calorie.display_value()
                );
            }
        }
        Err(err) => error!("failed to load calories: {err}"),
    }

    match health.fetch_time_standing().await {
        Ok(minutes) => println!("Time standing today: {minutes:.0} min"),
        Err(err) => error!("failed to load time standing: {err}"),
    }

    match health.fetch_activity_summary().await {
        Ok(summaries) => {
            println!("Activity summaries ({} days)", summaries.len());
            for summary in summaries.iter().take(7) {
                println!(
                    "  {}  move {:>6.0} kcal  exercise {:>4.0} min  stand {:>4.0} min",
                    summary.date.format("%b %-d, %Y"),
                    summary.active_energy_kcal,
                    summary.exercise_minutes,
                    summary.stand_minutes
                );
            }
        }
        Err(err) => error!("failed to load activity summaries: {err}"),
    }
}

async fn stream_motion(app: &App, options: &DemoOptions) {
    for status in app
        .raw_motion
        .start()
        .into_iter()
        .chain(app.device_motion.start())
    {
        if status.availability == Availability::Unavailable {
            warn!("{} is not available on this device", status.feed);
        }
    }

    let updates = Arc::new(AtomicU64::new(0));
    let observer = app.device_motion.source(Feed::DeviceMotion).map(|source| {
        let mut rx = source.watch();
        let updates = updates.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                updates.fetch_add(1, Ordering::Relaxed);
            }
        })
    });

    let deadline = Instant::now() + options.stream_for;
    let mut ticker = tokio::time::interval(options.print_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    while Instant::now() < deadline {
        ticker.tick().await;
        print_motion("CoreMotion", &app.raw_motion);
        print_motion("DeviceMotion", &app.device_motion);
    }

    app.raw_motion.stop();
    app.device_motion.stop();

    let frozen = (app.raw_motion.snapshot(), app.device_motion.snapshot());
    tokio::time::sleep(options.print_every).await;
    if frozen == (app.raw_motion.snapshot(), app.device_motion.snapshot()) {
        info!("snapshots unchanged after stop");
    } else {
        warn!("snapshots changed after stop");
    }

    if let Some(observer) = observer {
        observer.abort();
        info!(
            "device motion observer saw {} updates",
            updates.load(Ordering::Relaxed)
        );
    }
}

fn print_motion(label: &str, controller: &MotionController) {
    let snapshot = controller.snapshot();
    let line = snapshot
        .channels()
        .map(|(channel, value)| format!("{channel}: {value}"))
        .collect::<Vec<_>>()
        .join("  ");
    println!("[{label}] {line}");
}

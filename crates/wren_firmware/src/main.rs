use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use wren_core::FirmwareConfig;
use wren_motion::{Axis, ServoBus};

mod coordinator;

use coordinator::Coordinator;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "wren.toml")]
    config: PathBuf,

    /// Override the learned-state file location
    #[arg(long, env = "WREN_STATE_PATH")]
    state: Option<PathBuf>,

    /// Override the starting temperament archetype
    #[arg(long, env = "WREN_ARCHETYPE")]
    archetype: Option<String>,
}

/// Servo backend for hosts without PWM hardware: every write lands in
/// the trace log instead of a register. Gesture pacing still happens,
/// the motion code sleeps through `delay_ms` exactly as it would wait
/// on real servos.
struct TraceServoBus;

impl ServoBus for TraceServoBus {
    fn write(&mut self, axis: Axis, angle: i32) {
        tracing::trace!(?axis, angle, "servo write");
    }

    fn delay_ms(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut config = FirmwareConfig::load_or_default(&args.config);
    if let Some(state) = args.state {
        config.persistence.state_path = state;
    }
    if let Some(archetype) = args.archetype {
        config.robot.archetype = archetype;
    }
    info!(
        config = %args.config.display(),
        archetype = %config.robot.archetype,
        state = %config.persistence.state_path.display(),
        "starting wren"
    );

    // Stdin is the wire: commands, sensor lines and debug chatter all
    // arrive here, one line at a time.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut bus = TraceServoBus;
    let mut rng = StdRng::from_entropy();
    let mut coordinator = Coordinator::new(config);
    let started = Instant::now();

    coordinator.boot(&mut bus, 0.0);

    let tick = Duration::from_millis(20);
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let mut batch = Vec::new();
                while let Ok(line) = line_rx.try_recv() {
                    batch.push(line);
                }
                let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
                let now = started.elapsed().as_secs_f64();
                for out in coordinator.tick(&mut bus, &mut rng, &refs, now) {
                    println!("{}", out);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    let now = started.elapsed().as_secs_f64();
    if let Err(err) = coordinator.save_on_shutdown(now) {
        warn!(%err, "could not save state on shutdown");
    }
    Ok(())
}

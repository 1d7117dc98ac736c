use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

use pcq_engine::dispatcher::{DispatcherConfig, JobDispatcher};

#[derive(Parser, Debug)]
#[command(
    name = "Point Query Worker",
    about = "Answers index and corridor-profile queries against LAS/LAZ point clouds",
    version = "0.0.1"
)]
struct Cli {
    /// Root directory holding one subdirectory per dataset.
    #[arg(short, long, required = true, value_name = "DIR")]
    data_dir: PathBuf,

    /// Seconds to sleep when a scan finds no pending jobs.
    #[arg(long, default_value_t = 2)]
    poll_interval: u64,

    /// Failed jobs are dead-lettered after this many attempts.
    #[arg(long, default_value_t = 5)]
    max_attempts: u32,

    /// Seconds before the first retry of a failed job; doubles per attempt.
    #[arg(long, default_value_t = 30)]
    retry_backoff: u64,

    /// PROJ data directory for grid files.
    #[arg(long, value_name = "DIR")]
    proj_data_dir: Option<PathBuf>,
}

fn main() {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info)
        .init();

    let args = Cli::parse();

    log::info!("data dir: {:?}", args.data_dir);
    log::info!("poll interval: {}s", args.poll_interval);
    log::info!("max attempts: {}", args.max_attempts);

    if let Err(e) = std::fs::create_dir_all(&args.data_dir) {
        log::error!("cannot create data dir {:?}: {}", args.data_dir, e);
        std::process::exit(1);
    }

    let mut config = DispatcherConfig::new(args.data_dir);
    config.max_attempts = args.max_attempts;
    config.backoff_base = Duration::from_secs(args.retry_backoff);
    config.proj_data_dir = args.proj_data_dir;

    // One dispatcher instance per dataset tree: the queue has no claim
    // mechanism, so a second instance would double-process jobs.
    let mut dispatcher = JobDispatcher::new(config);

    log::info!("starting queue scan loop");
    loop {
        let processed = dispatcher.scan_once();
        if processed == 0 {
            thread::sleep(Duration::from_secs(args.poll_interval));
        }
    }
}

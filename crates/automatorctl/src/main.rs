#![forbid(unsafe_code)]

//! `automatorctl`: inspect and drive an automation service from the terminal.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use automator_client::{ClientConfig, HttpTransport, Mirror, MirrorError, RefreshScheduler};
use automator_core::api::{ProcessSettings, TaskSettings};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod render;
mod watch;

#[derive(Parser, Debug)]
#[command(name = "automatorctl")]
struct Args {
    /// TOML file with client settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Service root URL, e.g. http://127.0.0.1:8000
    #[arg(long)]
    base_url: Option<String>,

    /// Polling period in milliseconds.
    #[arg(long)]
    refresh_interval_ms: Option<u64>,

    /// Log level (env-filter syntax).
    #[arg(long, default_value = "info")]
    log: String,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Fetch once and print every process and task.
    List,
    /// Poll continuously and redraw; reads commands from stdin.
    Watch,
    /// Flip a process between running and stopped.
    Toggle { name: String },
    /// Start a new instance of a task.
    Start { name: String },
    SetProcess {
        name: String,
        /// Seconds per cycle.
        #[arg(long)]
        cycle_time: u64,
    },
    SetTask {
        name: String,
        /// Run duration in seconds.
        #[arg(long)]
        duration: u64,
    },
    Config {
        #[command(subcommand)]
        config: ConfigCmd,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCmd {
    /// Write the effective settings to a TOML file.
    Init { path: PathBuf },
}

impl Args {
    fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let mut cfg = match &self.config {
            Some(path) => ClientConfig::load_from(path)
                .with_context(|| format!("load config {}", path.display()))?,
            None => ClientConfig::default(),
        };
        if let Some(url) = &self.base_url {
            cfg.base_url = url.clone();
        }
        if let Some(ms) = self.refresh_interval_ms {
            cfg.refresh_interval_ms = ms;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Report validation failures with the service's own messages.
fn explain(err: MirrorError) -> anyhow::Error {
    match err.validation_message() {
        Some(msg) => anyhow::anyhow!("rejected: {msg}"),
        None => err.into(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&args.log))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = args.client_config()?;

    match args.cmd {
        Cmd::Config {
            config: ConfigCmd::Init { path },
        } => {
            cfg.save_to(&path)
                .with_context(|| format!("write config {}", path.display()))?;
            println!("wrote {}", path.display());
            Ok(())
        }
        cmd => run(cmd, &cfg).await,
    }
}

async fn run(cmd: Cmd, cfg: &ClientConfig) -> anyhow::Result<()> {
    let transport = HttpTransport::from_config(cfg).context("build http client")?;
    let mirror = Arc::new(Mirror::new(transport));
    tracing::debug!(base_url = %cfg.base_url, "client ready");

    match cmd {
        Cmd::List => {
            let summary = mirror.refresh_all().await;
            for group in &summary.failed {
                eprintln!("warning: could not fetch {group}");
            }
            let now = chrono::Utc::now();
            println!("{}", render::processes_table(&mirror.store().processes(), now));
            print!("{}", render::tasks_table(&mirror.store().tasks(), now));
        }
        Cmd::Watch => {
            let scheduler = Arc::new(RefreshScheduler::from_config(Arc::clone(&mirror), cfg));
            watch::run(scheduler, cfg.refresh_interval()).await?;
        }
        Cmd::Toggle { name } => {
            let handle = mirror.fetch_process(&name).await.map_err(explain)?;
            let record = mirror.toggle_status(&handle).await.map_err(explain)?;
            println!("{}: {}", record.name, record.status);
        }
        Cmd::Start { name } => {
            let handle = mirror.fetch_task(&name).await.map_err(explain)?;
            match mirror.start_task_instance(&handle).await.map_err(explain)? {
                Some(record) => println!("{}: {} ({})", record.name, record.status, record.id),
                None => println!("{name}: start already pending"),
            }
        }
        Cmd::SetProcess { name, cycle_time } => {
            let handle = mirror.fetch_process(&name).await.map_err(explain)?;
            let settings = ProcessSettings {
                cycle_time_seconds: Some(cycle_time),
            };
            let record = mirror
                .update_process(&handle, &settings)
                .await
                .map_err(explain)?;
            println!("{}: cycle_time={}s", record.name, record.cycle_time);
        }
        Cmd::SetTask { name, duration } => {
            let handle = mirror.fetch_task(&name).await.map_err(explain)?;
            let settings = TaskSettings {
                duration_seconds: Some(duration),
            };
            let record = mirror
                .update_task(&handle, &settings)
                .await
                .map_err(explain)?;
            println!("{}: duration={}s", record.name, record.duration);
        }
        Cmd::Config { .. } => {}
    }
    Ok(())
}

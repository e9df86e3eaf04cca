use clap::{Parser, Subcommand};
use distributed_framework::config::{
    DEFAULT_PREFIX_ROOT, DEFAULT_WORKER_PORT, FrameworkSettings, WorkerSettings,
};
use distributed_framework::framework::Framework;
use distributed_framework::uow::UowRegistry;
use distributed_framework::worker::{Worker, server};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Shard workers and the coordinator that drives them")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve one shard.
    Worker {
        #[arg(long, env = "SHARD_PORT", default_value_t = DEFAULT_WORKER_PORT)]
        port: u16,
    },
    /// Drive a run across the given shards.
    Framework {
        /// Worker address (`host:port`); repeat once per shard.
        #[arg(long = "shard", env = "FRAMEWORK_SHARDS", value_delimiter = ',', required = true)]
        shards: Vec<String>,
        /// Identifier of the unit of work to run.
        #[arg(long, env = "FRAMEWORK_UOW")]
        uow: String,
        #[arg(long, env = "FRAMEWORK_PREFIX_ROOT", default_value = DEFAULT_PREFIX_ROOT)]
        prefix_root: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let registry = UowRegistry::with_builtins();

    match cli.command {
        Commands::Worker { port } => {
            let worker = Worker::new(WorkerSettings::on_port(port), registry);

            let ctrl_c_worker = worker.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupted, stopping worker service");
                    ctrl_c_worker.shutdown().await;
                }
            });

            tracing::info!("Worker service running on port {}", port);
            server::run(worker).await?;
        }
        Commands::Framework {
            shards,
            uow,
            prefix_root,
        } => {
            let settings = FrameworkSettings {
                uow_name: uow,
                prefix_root,
            };
            let mut framework = Framework::new(settings, &registry)?;

            tracing::info!(
                "Framework launching based on {} stored at {}",
                framework.uow_name(),
                framework.prefix()
            );

            framework.assign_shards(shards, None)?;
            framework.orchestrate_run().await?;
        }
    }

    Ok(())
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use datadrift_lib::shared::utils::logger::init_logger;
use datadrift_lib::shared::Config;
use datadrift_lib::Services;

#[derive(Parser)]
#[command(name = "datadrift", version, about = "Crawl boards and subreddits into Postgres")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run crawl workers until Ctrl-C
    Work {
        /// Queues to consume; defaults to every crawl queue
        #[arg(long, value_delimiter = ',')]
        queues: Vec<String>,
        /// Worker slots; defaults to WORKER_CONCURRENCY
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Queue the first crawl of every configured board and subreddit
    Seed,
    /// Print job counts by status
    Stats,
    /// Delete finished jobs older than the given number of days
    Prune {
        #[arg(long, default_value_t = 7)]
        days: i32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();
    let cli = Cli::parse();

    let config = Config::from_env().context("Invalid configuration")?;
    let services = Services::build(config).context("Failed to initialize services")?;

    match cli.command {
        Command::Work {
            queues,
            concurrency,
        } => {
            let applied = services
                .run_migrations()
                .context("Failed to run database migrations")?;
            log::info!("Database ready ({} migrations applied)", applied);
            services.work(queues, concurrency).await?;
        }
        Command::Seed => {
            services.run_migrations().context("Failed to run database migrations")?;
            let queued = services.seed().await?;
            println!("Queued {} crawl jobs", queued);
        }
        Command::Stats => {
            let stats = services.statistics().await?;
            println!("pending:   {}", stats.pending_count);
            println!("scheduled: {}", stats.scheduled_count);
            println!("running:   {}", stats.running_count);
            println!("completed: {}", stats.completed_count);
            println!("failed:    {}", stats.failed_count);
            println!("total:     {}", stats.total_count);
        }
        Command::Prune { days } => {
            let removed = services.prune(days).await?;
            println!("Removed {} finished jobs", removed);
        }
    }

    Ok(())
}

#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod command;

use clap::{Parser, Subcommand};
use ghcore_search::LinkCategory;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use command::{
    CategoriesStrategy, CommandStrategy, InitStrategy, ResolveInput, ResolveStrategy,
    VersionStrategy,
};

#[derive(Parser)]
#[command(name = "ghcore")]
#[command(about = "Resolve GitHub references to collaboration entities", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve reference texts found in an event
    Resolve {
        /// Reference category, e.g. Issue_PR or SHA
        #[arg(short, long)]
        category: LinkCategory,

        /// Repository the texts were found in (owner/name)
        #[arg(long)]
        repo_name: Option<String>,

        /// Id of that repository
        #[arg(long)]
        repo_id: Option<i64>,

        /// Login of the event's actor
        #[arg(long)]
        actor_login: Option<String>,

        /// Resolve without GitHub or the event log
        #[arg(long)]
        offline: bool,

        /// Matched reference texts
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// List reference categories
    Categories,
    /// Initialize configuration
    Init,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            category,
            repo_name,
            repo_id,
            actor_login,
            offline,
            texts,
        } => {
            ResolveStrategy
                .execute(ResolveInput {
                    category,
                    texts,
                    repo_name,
                    repo_id,
                    actor_login,
                    offline,
                })
                .await?;
        }
        Commands::Categories => CategoriesStrategy.execute(()).await?,
        Commands::Init => InitStrategy.execute(()).await?,
        Commands::Version => VersionStrategy.execute(()).await?,
    }

    Ok(())
}

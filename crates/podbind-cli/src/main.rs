use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "podbind",
    about = "podbind — match pods against resource offers",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether an offer can host a pod and show the resulting binding
    Match {
        /// Pod spec (JSON)
        #[arg(short, long)]
        pod: String,
        /// Resource offer (JSON)
        #[arg(short, long)]
        offer: String,
        /// podbind.toml with executor baseline overrides
        #[arg(short, long)]
        config: Option<String>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Print the effective configuration
    Config {
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("podbind=info".parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Match { pod, offer, config, format } => {
            commands::offer_match::run(&pod, &offer, config.as_deref(), &format)
        }
        Commands::Config { config } => commands::config::show(config.as_deref()),
    }
}

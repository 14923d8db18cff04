mod doctor_commands;
mod format_commands;
mod relay_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "relaygram", about = "Relaygram: Telegram channel relay")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./relaygram.toml and the user
    /// config dir).
    #[arg(long, global = true, env = "RELAYGRAM_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start relaying (default when no subcommand is provided).
    Run,
    /// Validate configuration and report problems.
    Doctor {
        /// Also contact Telegram to verify the token and resolve sources.
        #[arg(long)]
        online: bool,
    },
    /// Render a post through the formatter and print the HTML.
    Format {
        /// Post text.
        #[arg(long)]
        text: String,
        /// Bot API entities as a JSON array.
        #[arg(long)]
        entities: Option<String>,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    match cli.command {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "relaygram starting");
            relay_commands::run(cli.config.as_deref()).await
        },
        Some(Commands::Doctor { online }) => {
            doctor_commands::handle_doctor(cli.config.as_deref(), online).await
        },
        Some(Commands::Format { text, entities }) => {
            println!("{}", format_commands::render(&text, entities.as_deref())?);
            Ok(())
        },
    }
}

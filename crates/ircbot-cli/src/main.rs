mod classify;
mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ircbot_config::BotConfig;

#[derive(Parser)]
#[command(name = "ircbot", about = "Extensible IRC bot")]
struct Cli {
    /// Config file (defaults to ~/.ircbot/config.json5)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the configured server and run until a fatal error
    Run {
        /// Nick override
        #[arg(short, long)]
        nick: Option<String>,
    },
    /// Classify protocol lines read from stdin and print them as JSON
    Classify {
        /// Nick the bot would be registered with
        #[arg(short, long)]
        nick: Option<String>,
    },
    /// Write a default config file if none exists
    Init,
    /// Check configuration health
    Health,
}

fn load(path: Option<&PathBuf>) -> Result<BotConfig, ircbot_config::ConfigError> {
    match path {
        Some(path) => ircbot_config::load_config_from(path),
        None => ircbot_config::load_config(),
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load(cli.config.as_ref());
    init_tracing(config.as_ref().is_ok_and(|c| c.irc.debug));
    let mut config = config.inspect_err(|e| tracing::error!("Failed to load config: {e}"))?;

    match cli.command {
        Commands::Run { nick } => {
            if let Some(nick) = nick {
                config.irc.nick = nick;
            }
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            rt.block_on(run::run_bot(config))?;
        }
        Commands::Classify { nick } => {
            let nick = nick.unwrap_or(config.irc.nick);
            classify::run_classify(&nick)?;
        }
        Commands::Init => {
            let path = match cli.config {
                Some(path) => path,
                None => ircbot_config::config_file_path()?,
            };
            if path.exists() {
                println!("Config already exists at {}", path.display());
            } else {
                ircbot_config::save_config_to(&BotConfig::default(), &path)?;
                println!("Wrote default config to {}", path.display());
            }
        }
        Commands::Health => {
            println!("ircbot is healthy");
            println!("  server: {}:{}", config.irc.server, config.irc.port);
            println!("  nick: {}", config.irc.nick);
            println!("  channels: {}", config.irc.channels.join(", "));
            println!("  framing: {:?}", config.engine.framing);
            println!("  plugins: {}", config.plugins.enabled.join(", "));
            if let Err(e) = config.validate() {
                println!("  config problem: {e}");
            }
        }
    }

    Ok(())
}

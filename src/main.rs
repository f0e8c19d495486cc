use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use messenger_client::infrastructure::config::parse_channel_list;
use messenger_client::{Config, MessengerClient, MessengerEvent, TelegramClient};

#[derive(Parser)]
#[command(name = "messenger-client")]
#[command(about = "Telegram messenger adapter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,

    /// Comma separated confinement channels (overrides config)
    #[arg(long)]
    channels: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and log every inbound message
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            if let Err(e) = run(&cli).await {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("messenger-client v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn load_config(cli: &Cli) -> Config {
    let mut config = if std::path::Path::new(&cli.config).exists() {
        Config::load(&cli.config).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        Config::default()
    };
    config.apply_env();

    if let Some(token) = &cli.token {
        config.telegram.token = Some(token.clone());
    }
    if let Some(channels) = &cli.channels {
        config.messenger.confinement_channels = parse_channel_list(channels);
    }
    config
}

async fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli);

    let mut client = TelegramClient::from_config(&config)?;
    let mut messages = client.emitter().subscribe();
    client.connect().await?;
    client.set_status().await?;
    client.listen_messages().await?;

    if let Some(identity) = client.identity() {
        tracing::info!("Listening as {}", identity);
    }

    loop {
        tokio::select! {
            event = messages.recv() => match event {
                Ok(MessengerEvent::Message(msg)) => {
                    tracing::info!(
                        "[{}] {}: {} (dm={}, replied={}, mentioned={})",
                        msg.channel_id,
                        msg.username.as_deref().unwrap_or("?"),
                        msg.content,
                        msg.is_dm,
                        msg.is_replied,
                        msg.is_mentioned,
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Skipped {} messages", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

fn init_config() {
    let config = Config::default();
    match serde_yaml::to_string(&config) {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => eprintln!("Failed to render config: {}", e),
    }
}

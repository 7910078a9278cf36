use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serenity::model::gateway::GatewayIntents;
use tracing::{debug, info};

use rivbot_lib::api::{self, ParseEndpoint, RivenClient, Services, TmdbCatalog};
use rivbot_lib::config::AppConfig;
use rivbot_lib::handlers::commands::CommandContext;
use rivbot_lib::handlers::discord::Handler;
use rivbot_lib::handlers::router::Router;
use rivbot_lib::setup;
use rivbot_lib::store::SessionStore;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config.json (defaults to the platform config dir, then ./data)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Check configuration and Riven connectivity, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    use clap::Parser;
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref())?;
    config.validate()?;
    setup::init_tracing(config.log_to_file)?;

    let http = api::http_client(config.request_timeout())?;
    let riven = Arc::new(RivenClient::new(
        http.clone(),
        &config.riven_api_url,
        config.riven_api_token.clone(),
    ));

    // -- CLI MODE --
    if args.check {
        println!("Checking configuration...");
        match riven.health().await {
            Ok(()) => println!("Riven reachable at {}", config.riven_api_url),
            Err(e) => println!("Riven health check failed: {}", e),
        }
        match config.release_settings() {
            Ok(settings) => println!("Latest releases enabled ({} entries).", settings.count),
            Err(key) => println!("Latest releases disabled, missing `{}`.", key),
        }
        return Ok(());
    }

    let catalog = Arc::new(TmdbCatalog::new(
        http.clone(),
        config.tmdb_api_key.clone(),
        ParseEndpoint {
            base_url: config.riven_api_url.clone(),
            token: config.riven_api_token.clone(),
        },
    ));
    let services = Services {
        catalog: catalog.clone(),
        library: riven.clone(),
    };

    let store = Arc::new(SessionStore::new(config.session_timeout()));
    spawn_sweeper(store.clone());
    let router = Router::new(store, services);

    let token = config.discord_bot_token.clone();
    let commands = CommandContext {
        config: Arc::new(config),
        catalog,
        riven,
        http,
    };

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::DIRECT_MESSAGE_REACTIONS;

    let mut client = serenity::Client::builder(&token, intents)
        .event_handler(Handler::new(router, commands))
        .await?;

    info!("Starting Discord client");
    client.start().await?;
    Ok(())
}

/// Drop idle sessions in the background
fn spawn_sweeper(store: Arc<SessionStore>) {
    let period = (store.timeout() / 2).max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let removed = store.sweep();
            if removed > 0 {
                debug!(removed, remaining = store.len(), "Swept idle sessions");
            }
        }
    });
}

//! `chorebot run`: bootstrap the household store and connect to Discord.

use chorebot_core::{Config, Household, SharedHousehold, SystemClock};
use serenity::all::GatewayIntents;
use serenity::Client;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::handler::Handler;

/// Environment variable holding the bot token.
const TOKEN_ENV: &str = "DISCORD_TOKEN";

pub async fn run(
    config: Option<PathBuf>,
    env_file: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match env_file {
        Some(path) => {
            dotenvy::from_path(&path)?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    let token = std::env::var(TOKEN_ENV)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| format!("{TOKEN_ENV} is not set (environment or .env file)"))?;

    let (config, path) = Config::load_or_init(config.as_deref())?;
    info!(
        path = %path.display(),
        task_types = config.tasks.points.len(),
        window_start = config.accrual.window_start_hour,
        window_end = config.accrual.window_end_hour,
        "configuration loaded"
    );

    let household = SharedHousehold::new(Household::new(
        config.tasks.points.clone(),
        Arc::new(SystemClock),
    ));
    let scheduler = Arc::new(Mutex::new(None));
    let handler = Handler::new(household, &config, scheduler.clone());

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await?;

    let running = scheduler.lock().unwrap_or_else(|e| e.into_inner()).take();
    if let Some(handle) = running {
        handle.stop().await;
    }
    Ok(())
}

use chorebot_core::Config;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the resolved config file path
    Path,
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "accrual.rate_per_tick", "tasks.points.cloth")
        key: String,
    },
    /// List all config values as JSON
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(config: Option<PathBuf>, action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Path => {
            let path = Config::resolve_path(config.as_deref())?;
            println!("{}", path.display());
        }
        ConfigAction::Get { key } => {
            let (config, _) = Config::load(config.as_deref())?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::List => {
            let (config, _) = Config::load(config.as_deref())?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            let path = Config::resolve_path(config.as_deref())?;
            Config::default().save_to(&path)?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

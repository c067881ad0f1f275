use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub database_url: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        if dotenvy::dotenv().is_err() {
            info!("No .env file found, reading the process environment only");
        }

        Self {
            port: try_load("PORT", 8080),
            data_path: PathBuf::from(try_load("DATA_PATH", "data/database.json".to_string())),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
        }
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}

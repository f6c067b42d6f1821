use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{classifier::data::WELCOME_MESSAGE, errors::Error, utils::split_csv, Result};

/// Typed configuration, read from the environment (plus an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Transport
    pub telegram_bot_token: String,
    pub operator_ids: Vec<i64>,

    // Contacts
    pub contacts_file: PathBuf,
    pub default_contacts: Vec<String>,

    // Classifier
    pub faq_file: Option<PathBuf>,

    // Outbound
    pub broadcast_delay: Duration,
    pub welcome_message: String,
    pub welcome_image: Option<PathBuf>,

    // Event bus
    pub event_bus_capacity: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        let operator_ids = parse_csv_i64(env_str("OPERATOR_IDS"));

        let contacts_file = env_path("CONTACTS_FILE")
            .unwrap_or_else(|| PathBuf::from("data/authorized-contacts.json"));
        if let Some(parent) = contacts_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // The seed list is deployment-specific; an empty seed is allowed but suspicious.
        let default_contacts = env_str("DEFAULT_CONTACTS")
            .map(|v| split_csv(&v))
            .unwrap_or_default();
        if default_contacts.is_empty() {
            tracing::warn!("DEFAULT_CONTACTS is not set; first run starts with no authorized contacts");
        }

        let faq_file = env_path("FAQ_FILE");

        let broadcast_delay =
            Duration::from_millis(env_u64("BROADCAST_DELAY_MS").unwrap_or(2_000));
        let welcome_message = env_str("WELCOME_MESSAGE")
            .and_then(non_empty)
            .unwrap_or_else(|| WELCOME_MESSAGE.to_string());
        let welcome_image = env_path("WELCOME_IMAGE");

        let event_bus_capacity = env_usize("EVENT_BUS_CAPACITY").unwrap_or(1024).max(1);

        Ok(Self {
            telegram_bot_token,
            operator_ids,
            contacts_file,
            default_contacts,
            faq_file,
            broadcast_delay,
            welcome_message,
            welcome_image,
            event_bus_capacity,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, strip_quotes(v.trim()));
    }
}

fn strip_quotes(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return &val[1..val.len() - 1];
    }
    val
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_str(key).and_then(non_empty).map(PathBuf::from)
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    split_csv(&v.unwrap_or_default())
        .iter()
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

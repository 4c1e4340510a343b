use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Application configuration. Loaded from an optional JSON file overlaid
/// with environment variables (env vars win).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub kafka_url: String,
    #[serde(default)]
    pub kafka_consumer_group: String,
    #[serde(default)]
    pub val_key_url: String,
    #[serde(default)]
    pub device_repository_url: String,
    #[serde(default)]
    pub device_selection_url: String,
    #[serde(default)]
    pub marshaller_url: String,
    #[serde(default)]
    pub notification_url: String,
    #[serde(default)]
    pub notification_topic: String,
    #[serde(default)]
    pub notifications_ignore_duplicates_within_seconds: i64,
    #[serde(default)]
    pub cache_duration_secs: u64,
    #[serde(default)]
    pub cache_invalidation_kafka_topics: Vec<String>,
    #[serde(default)]
    pub mongo_url: String,
    #[serde(default)]
    pub mongo_table: String,
    #[serde(default)]
    pub mongo_anomaly_collection: String,
    #[serde(default)]
    pub anomaly_detector_attribute: String,
    #[serde(default = "default_debounce_ms")]
    pub reload_debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    2_000
}

impl Default for Config {
    fn default() -> Self {
        Config {
            debug: false,
            kafka_url: String::new(),
            kafka_consumer_group: String::new(),
            val_key_url: String::new(),
            device_repository_url: String::new(),
            device_selection_url: String::new(),
            marshaller_url: String::new(),
            notification_url: String::new(),
            notification_topic: String::new(),
            notifications_ignore_duplicates_within_seconds: 0,
            cache_duration_secs: 60,
            cache_invalidation_kafka_topics: Vec::new(),
            mongo_url: String::new(),
            mongo_table: String::new(),
            mongo_anomaly_collection: String::new(),
            anomaly_detector_attribute: String::new(),
            reload_debounce_ms: default_debounce_ms(),
        }
    }
}

impl Config {
    /// Load configuration: start from an optional JSON file, then let
    /// environment variables override any field they name.
    pub fn load(file_path: Option<&Path>) -> anyhow::Result<Self> {
        let mut conf = match file_path {
            Some(path) if path.exists() => {
                let raw = fs::read_to_string(path)?;
                serde_json::from_str(&raw)?
            }
            _ => Config::default(),
        };
        conf.apply_env_overrides();
        Ok(conf)
    }

    /// Load purely from the environment, ignoring any config file.
    pub fn from_env() -> Self {
        let mut conf = Config::default();
        conf.apply_env_overrides();
        conf
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("DEBUG") {
            self.debug = v.eq_ignore_ascii_case("true");
        }
        str_override(&mut self.kafka_url, "KAFKA_URL");
        str_override(&mut self.kafka_consumer_group, "KAFKA_CONSUMER_GROUP");
        str_override(&mut self.val_key_url, "VAL_KEY_URL");
        str_override(&mut self.device_repository_url, "DEVICE_REPOSITORY_URL");
        str_override(&mut self.device_selection_url, "DEVICE_SELECTION_URL");
        str_override(&mut self.marshaller_url, "MARSHALLER_URL");
        str_override(&mut self.notification_url, "NOTIFICATION_URL");
        str_override(&mut self.notification_topic, "NOTIFICATION_TOPIC");
        if let Ok(v) = env::var("NOTIFICATIONS_IGNORE_DUPLICATES_WITHIN_SECONDS") {
            if let Ok(parsed) = v.parse() {
                self.notifications_ignore_duplicates_within_seconds = parsed;
            }
        }
        if let Ok(v) = env::var("CACHE_DURATION_SECS") {
            if let Ok(parsed) = v.parse() {
                self.cache_duration_secs = parsed;
            }
        }
        if let Ok(v) = env::var("CACHE_INVALIDATION_KAFKA_TOPICS") {
            let sep = env::var("CACHE_INVALIDATION_KAFKA_TOPICS_SEP").unwrap_or_else(|_| ",".to_string());
            self.cache_invalidation_kafka_topics =
                v.split(sep.as_str()).map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        str_override(&mut self.mongo_url, "MONGO_URL");
        str_override(&mut self.mongo_table, "MONGO_TABLE");
        str_override(&mut self.mongo_anomaly_collection, "MONGO_ANOMALY_COLLECTION");
        str_override(&mut self.anomaly_detector_attribute, "ANOMALY_DETECTOR_ATTRIBUTE");
        if let Ok(v) = env::var("RELOAD_DEBOUNCE_MS") {
            if let Ok(parsed) = v.parse() {
                self.reload_debounce_ms = parsed;
            }
        }
    }

    /// Log the presence (not the value) of every sensitive field, for startup diagnostics.
    pub fn log_redacted(&self) {
        for (name, value) in [
            ("KAFKA_URL", &self.kafka_url),
            ("VAL_KEY_URL", &self.val_key_url),
            ("DEVICE_REPOSITORY_URL", &self.device_repository_url),
            ("DEVICE_SELECTION_URL", &self.device_selection_url),
            ("MARSHALLER_URL", &self.marshaller_url),
            ("NOTIFICATION_URL", &self.notification_url),
            ("MONGO_URL", &self.mongo_url),
        ] {
            if value.is_empty() {
                tracing::info!("{name} = (empty)");
            } else {
                tracing::info!("{name} = ({} chars)", value.len());
            }
        }
    }
}

fn str_override(field: &mut String, key: &str) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

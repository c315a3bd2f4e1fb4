use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use letterflow_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let sources = SourceLookup { doc: config_file_doc.as_ref(), path: config_file_path.as_deref() };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_keys) in effective_values(&config) {
        lines.push(render_line(key_path, &value, sources.field_source(key_path, env_keys)));
    }
    lines.join("\n")
}

type ConfigEntry = (&'static str, String, &'static [&'static str]);

/// Each effective value with the env variables that can set it.
fn effective_values(config: &AppConfig) -> Vec<ConfigEntry> {
    fn entry(key: &'static str, value: String, env_keys: &'static [&'static str]) -> ConfigEntry {
        (key, value, env_keys)
    }

    vec![
        entry("database.url", config.database.url.clone(), &["LETTERFLOW_DATABASE_URL"]),
        entry(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["LETTERFLOW_DATABASE_MAX_CONNECTIONS"],
        ),
        entry(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["LETTERFLOW_DATABASE_TIMEOUT_SECS"],
        ),
        entry(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["LETTERFLOW_SERVER_BIND_ADDRESS"],
        ),
        entry("server.port", config.server.port.to_string(), &["LETTERFLOW_SERVER_PORT"]),
        entry(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["LETTERFLOW_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        entry(
            "logging.level",
            config.logging.level.clone(),
            &["LETTERFLOW_LOGGING_LEVEL", "LETTERFLOW_LOG_LEVEL"],
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["LETTERFLOW_LOGGING_FORMAT", "LETTERFLOW_LOG_FORMAT"],
        ),
        entry(
            "workflow.certificate_forward_role",
            config.workflow.certificate_forward_role.to_string(),
            &["LETTERFLOW_WORKFLOW_CERTIFICATE_FORWARD_ROLE"],
        ),
        entry(
            "workflow.notifications_enabled",
            config.workflow.notifications_enabled.to_string(),
            &["LETTERFLOW_WORKFLOW_NOTIFICATIONS_ENABLED"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("letterflow.toml"), PathBuf::from("config/letterflow.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

struct SourceLookup<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

impl SourceLookup<'_> {
    fn field_source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

use secrecy::ExposeSecret;

use tally_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let api_key = match &config.inference.api_key {
        Some(key) => redact_secret(key.expose_secret()),
        None => "(not set)".to_string(),
    };

    let lines = vec![
        "effective config (source precedence: env > file > default):".to_string(),
        render_line("database.url", &config.database.url),
        render_line("database.max_connections", &config.database.max_connections.to_string()),
        render_line("database.timeout_secs", &config.database.timeout_secs.to_string()),
        render_line("database.busy_timeout_ms", &config.database.busy_timeout_ms.to_string()),
        render_line("inference.base_url", &config.inference.base_url),
        render_line("inference.model", &config.inference.model),
        render_line("inference.api_key", &api_key),
        render_line("inference.timeout_secs", &config.inference.timeout_secs.to_string()),
        render_line("inference.max_attempts", &config.inference.max_attempts.to_string()),
        render_line("inference.backoff_base_ms", &config.inference.backoff_base_ms.to_string()),
        render_line("logging.level", &config.logging.level),
        render_line("logging.format", &format!("{:?}", config.logging.format)),
    ];

    lines.join("\n")
}

fn render_line(key: &str, value: &str) -> String {
    format!("  {key} = {value}")
}

fn redact_secret(value: &str) -> String {
    if value.len() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", &value[..4])
    }
}

use serde::Serialize;

use crate::commands::CommandResult;
use tally_core::config::{AppConfig, LoadOptions};
use tally_db::connect;

#[derive(Debug, Serialize)]
struct DoctorReport {
    checks: Vec<DoctorCheck>,
    healthy: bool,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: String,
    status: String,
    detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        status: if passed { "ok" } else { "fail" }.to_string(),
        detail: detail.into(),
    }
}

pub fn run(json: bool) -> CommandResult {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(check("config", true, "configuration loaded and validated"));
            Some(config)
        }
        Err(error) => {
            checks.push(check("config", false, error.to_string()));
            None
        }
    };

    if let Some(config) = &config {
        let detail = if config.inference.api_key.is_some() {
            "api key configured".to_string()
        } else {
            format!("no api key; requests go to {} unauthenticated", config.inference.base_url)
        };
        checks.push(check("inference", true, detail));

        match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => {
                let connectivity = runtime.block_on(async {
                    match connect(&config.database).await {
                        Ok(pool) => {
                            pool.close().await;
                            Ok(())
                        }
                        Err(error) => Err(error.to_string()),
                    }
                });
                match connectivity {
                    Ok(()) => checks.push(check(
                        "database",
                        true,
                        format!("connected to {}", config.database.url),
                    )),
                    Err(error) => checks.push(check("database", false, error.to_string())),
                }
            }
            Err(error) => checks.push(check("database", false, format!("runtime init: {error}"))),
        }
    }

    let healthy = checks.iter().all(|check| check.status == "ok");
    let report = DoctorReport { checks, healthy };
    let exit_code = if healthy { 0 } else { 1 };

    let output = if json {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| error.to_string())
    } else {
        let mut lines: Vec<String> = report
            .checks
            .iter()
            .map(|check| format!("[{}] {}: {}", check.status, check.name, check.detail))
            .collect();
        lines.push(if report.healthy {
            "tally is ready".to_string()
        } else {
            "tally is not ready".to_string()
        });
        lines.join("\n")
    };

    CommandResult { exit_code, output }
}

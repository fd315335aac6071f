// src/lambda/mod.rs

//! AWS Lambda handler for the watcher.
//!
//! This module provides the Lambda function entry point that:
//! 1. Loads configuration and locales from S3 (or a bundled storage directory)
//! 2. Scrapes every enabled source within the invocation deadline
//! 3. Notifies subscribers about changes
//! 4. Commits the new snapshots

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::{S3ConfigLoader, Settings, load_local};
use crate::error::Result;
use crate::notify::delivery_channel;
use crate::pipeline::{Pipeline, RunBudget, RunOptions, RunReport};
use crate::services::SourceRegistry;
use crate::storage::{LocalStorage, S3Storage, SnapshotStore, SubscriberDirectory};
use crate::utils::http;

/// Time kept back from the invocation deadline for committing and reporting.
const DEADLINE_RESERVE: Duration = Duration::from_secs(10);

/// Lambda invocation payload.
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    /// Restrict the run to these sources (all enabled sources if absent)
    #[serde(default)]
    pub sources: Option<Vec<String>>,

    /// Log messages instead of sending them and keep the stored snapshots
    #[serde(default)]
    pub dry_run: bool,

    /// Bypass the drop guard
    #[serde(default)]
    pub force: bool,
}

/// Lambda response payload.
#[derive(Debug, Default, Serialize)]
pub struct RunResponse {
    /// Whether every source completed
    pub success: bool,

    /// Setup error that prevented the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Per-source results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

/// Main Lambda handler function.
#[instrument(skip(event))]
pub async fn handler(
    event: LambdaEvent<RunRequest>,
) -> std::result::Result<RunResponse, LambdaError> {
    let start = Instant::now();
    let (request, context) = event.into_parts();
    let remaining = context
        .deadline()
        .duration_since(SystemTime::now())
        .unwrap_or_default();

    info!(
        "Starting run: sources={:?}, dry_run={}, force={}, remaining={}ms",
        request.sources,
        request.dry_run,
        request.force,
        remaining.as_millis()
    );

    match execute(&request, remaining).await {
        Ok(report) => {
            let success = !report.has_failures();
            if !success {
                warn!(
                    "Run finished with {} failed source(s)",
                    report.failed_sources().count()
                );
            }
            for source in report.guard_blocked() {
                warn!(
                    source = %source.source_id,
                    "Drop guard kept the stored snapshot; send \"force\": true to accept"
                );
            }
            Ok(RunResponse {
                success,
                error: None,
                report: Some(report),
                execution_time_ms: start.elapsed().as_millis() as u64,
            })
        }
        Err(e) => {
            error!("Run failed: {}", e);
            Ok(RunResponse {
                success: false,
                error: Some(e.to_string()),
                execution_time_ms: start.elapsed().as_millis() as u64,
                ..Default::default()
            })
        }
    }
}

/// Storage and settings for one invocation.
struct Environment {
    settings: Settings,
    snapshots: Arc<dyn SnapshotStore>,
    subscribers: Arc<dyn SubscriberDirectory>,
}

/// Internal run logic.
async fn execute(request: &RunRequest, remaining: Duration) -> Result<RunReport> {
    let Environment {
        settings,
        snapshots,
        subscribers,
    } = load_environment().await?;
    settings.validate()?;
    let Settings { config, locales } = settings;

    let client = http::create_async_client(&config.http)?;
    let mut registry = SourceRegistry::from_config(&config, &client)?;
    if let Some(sources) = &request.sources {
        registry = registry.restrict_to(sources)?;
    }

    let channel = delivery_channel(&client, &config.telegram, request.dry_run)?;
    let pipeline = Pipeline::from_config(
        &config,
        registry,
        snapshots,
        subscribers,
        channel,
        Arc::new(locales),
    );

    let budget = RunBudget::new(run_budget(remaining, config.pipeline.time_budget_secs));
    info!(
        "Time budget: {}ms",
        budget.remaining().unwrap_or_default().as_millis()
    );

    let options = RunOptions {
        force: request.force,
        commit: !request.dry_run,
    };
    Ok(pipeline.run(&budget, options).await)
}

/// S3 when `S3_BUCKET` is set, otherwise the directory in `STORAGE_DIR`.
async fn load_environment() -> Result<Environment> {
    if std::env::var("S3_BUCKET").is_ok() {
        let storage = S3Storage::from_env().await?;
        let config_prefix =
            std::env::var("CONFIG_S3_PREFIX").unwrap_or_else(|_| storage.key("config"));
        let settings = S3ConfigLoader::new(storage.clone(), &config_prefix)
            .load()
            .await?;
        let storage = Arc::new(storage.with_config(&settings.config.storage));
        info!("Using S3 bucket {}", storage.bucket());
        return Ok(Environment {
            settings,
            snapshots: storage.clone(),
            subscribers: storage,
        });
    }

    let storage_dir =
        PathBuf::from(std::env::var("STORAGE_DIR").unwrap_or_else(|_| "storage".to_string()));
    let settings = load_local(&storage_dir, None)?;
    let storage = Arc::new(LocalStorage::with_config(
        &storage_dir,
        &settings.config.storage,
    ));
    info!("Using storage directory {}", storage_dir.display());
    Ok(Environment {
        settings,
        snapshots: storage.clone(),
        subscribers: storage,
    })
}

/// Invocation time left minus the reserve, capped by the configured budget.
fn run_budget(remaining: Duration, configured_secs: Option<u64>) -> Duration {
    let available = remaining.saturating_sub(DEADLINE_RESERVE);
    match configured_secs {
        Some(secs) => available.min(Duration::from_secs(secs)),
        None => available,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_request_defaults() {
        let req: RunRequest = serde_json::from_str("{}").unwrap();
        assert!(req.sources.is_none());
        assert!(!req.dry_run);
        assert!(!req.force);
    }

    #[test]
    fn test_run_request_with_options() {
        let json = r#"{"sources": ["meisengeige"], "dry_run": true, "force": true}"#;
        let req: RunRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.sources, Some(vec!["meisengeige".to_string()]));
        assert!(req.dry_run);
        assert!(req.force);
    }

    #[test]
    fn test_run_budget_keeps_reserve() {
        assert_eq!(
            run_budget(Duration::from_secs(60), None),
            Duration::from_secs(50)
        );
        assert_eq!(
            run_budget(Duration::from_secs(60), Some(30)),
            Duration::from_secs(30)
        );
        assert_eq!(run_budget(Duration::from_secs(5), None), Duration::ZERO);
    }

    #[test]
    fn test_setup_error_response() {
        let response = RunResponse {
            error: Some("S3_BUCKET is not set".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("report").is_none());
    }
}

//! Configuration types for Tasklane.
//!
//! `TasklaneConfig` represents the top-level `config.toml`: server binding,
//! resource naming templates, run/event-stream tuning and logging output.
//! Every field has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasklaneConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub runs: RunConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Prefixes used to derive and generate resource names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Prefix for thread names, including the editor run and personal threads.
    #[serde(default = "default_thread_prefix")]
    pub thread_prefix: String,
    #[serde(default = "default_workflow_prefix")]
    pub workflow_prefix: String,
    #[serde(default = "default_workflow_execution_prefix")]
    pub workflow_execution_prefix: String,
    #[serde(default = "default_cron_job_prefix")]
    pub cron_job_prefix: String,
    #[serde(default = "default_webhook_prefix")]
    pub webhook_prefix: String,
    #[serde(default = "default_email_receiver_prefix")]
    pub email_receiver_prefix: String,
    /// Domain for inbound email receiver addresses.
    #[serde(default = "default_email_domain")]
    pub email_domain: String,
}

fn default_thread_prefix() -> String {
    "t1".to_string()
}

fn default_workflow_prefix() -> String {
    "w1".to_string()
}

fn default_workflow_execution_prefix() -> String {
    "we1".to_string()
}

fn default_cron_job_prefix() -> String {
    "cj1".to_string()
}

fn default_webhook_prefix() -> String {
    "wh1".to_string()
}

fn default_email_receiver_prefix() -> String {
    "er1".to_string()
}

fn default_email_domain() -> String {
    "tasks.localhost".to_string()
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            thread_prefix: default_thread_prefix(),
            workflow_prefix: default_workflow_prefix(),
            workflow_execution_prefix: default_workflow_execution_prefix(),
            cron_job_prefix: default_cron_job_prefix(),
            webhook_prefix: default_webhook_prefix(),
            email_receiver_prefix: default_email_receiver_prefix(),
            email_domain: default_email_domain(),
        }
    }
}

/// Run orchestration and event streaming settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// How long event streaming waits for a thread to attach.
    #[serde(default = "default_attach_timeout_secs")]
    pub attach_timeout_secs: u64,
    /// Number of past engine runs replayed before following live events.
    #[serde(default = "default_max_history_runs")]
    pub max_history_runs: usize,
    /// Interval at which attachment waits re-read the run regardless of the
    /// change feed.
    #[serde(default = "default_resync_interval_secs")]
    pub resync_interval_secs: u64,
    /// Run events kept in the event log; the oldest are dropped first.
    /// `0` keeps everything.
    #[serde(default = "default_event_retention")]
    pub event_retention: usize,
}

fn default_attach_timeout_secs() -> u64 {
    600
}

fn default_max_history_runs() -> usize {
    100
}

fn default_resync_interval_secs() -> u64 {
    30
}

fn default_event_retention() -> usize {
    100_000
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            attach_timeout_secs: default_attach_timeout_secs(),
            max_history_runs: default_max_history_runs(),
            resync_interval_secs: default_resync_interval_secs(),
            event_retention: default_event_retention(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
    /// Bridge tracing spans to OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub otel: bool,
}

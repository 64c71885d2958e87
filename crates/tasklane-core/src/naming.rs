//! Deterministic resource names.
//!
//! Trigger resources, editor runs and personal threads are addressed by a
//! name derived from their owners, so they can be found without an index
//! and created exactly once through create-if-absent.

use rand::RngCore;
use sha2::{Digest, Sha256};
use tasklane_types::config::NamingConfig;

/// Longest name the store accepts.
const MAX_NAME_LEN: usize = 63;

/// Length of the readable part kept when a name must be shortened.
const TRUNCATED_LEN: usize = 55;

/// Join `parts` with `-`. Results longer than 63 characters are cut to 55
/// characters and suffixed with `-` and the first 7 hex digits of the
/// SHA-256 of the full joined string, so distinct inputs stay distinct.
pub fn safe_hash_concat_name(parts: &[&str]) -> String {
    let joined = parts.join("-");
    if joined.len() <= MAX_NAME_LEN {
        return joined;
    }

    let digest = format!("{:x}", Sha256::digest(joined.as_bytes()));
    let mut cut = TRUNCATED_LEN;
    while !joined.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}-{}", &joined[..cut], &digest[..7])
}

/// Generate a new 16-character task alias.
pub fn generate_alias() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Derives every deterministic name from the configured prefixes.
#[derive(Debug, Clone, Default)]
pub struct ResourceNamer {
    config: NamingConfig,
}

impl ResourceNamer {
    pub fn new(config: NamingConfig) -> Self {
        Self { config }
    }

    pub fn cron_job_name(&self, task_id: &str) -> String {
        safe_hash_concat_name(&[&self.config.cron_job_prefix, task_id])
    }

    pub fn webhook_name(&self, task_id: &str) -> String {
        safe_hash_concat_name(&[&self.config.webhook_prefix, task_id])
    }

    pub fn email_receiver_name(&self, task_id: &str) -> String {
        safe_hash_concat_name(&[&self.config.email_receiver_prefix, task_id])
    }

    /// The singleton interactive run of `user_id` on `task_id`.
    pub fn editor_run_name(&self, task_id: &str, user_id: &str) -> String {
        safe_hash_concat_name(&[&self.config.thread_prefix, task_id, user_id])
    }

    /// The caller's personal thread with an agent.
    pub fn user_thread_name(&self, agent_id: &str, user_id: &str) -> String {
        safe_hash_concat_name(&[&self.config.thread_prefix, agent_id, user_id])
    }

    pub fn email_address(&self, alias: &str) -> String {
        format!("{alias}@{}", self.config.email_domain)
    }

    pub fn workflow_prefix(&self) -> &str {
        &self.config.workflow_prefix
    }

    pub fn workflow_execution_prefix(&self) -> &str {
        &self.config.workflow_execution_prefix
    }
}

//! Query parameter extractors.

use serde::Deserialize;

/// Query parameters for the run launch endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct RunQuery {
    /// Advance the caller's editor run to this step instead of starting a
    /// new run.
    pub step: Option<String>,
}

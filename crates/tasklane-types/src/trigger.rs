//! Trigger side resources derived from a Task's declared trigger.
//!
//! Each is stored under a deterministic name derived from the Task ID and
//! consumed by a separate reconciler (cron scheduler, webhook router, email
//! ingestion) that this crate does not define.

use serde::{Deserialize, Serialize};

use crate::resource::{IndexField, ObjectMeta, Resource, ResourceKind, TaskOwned};

/// Present iff the Task declares a `schedule`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronJob {
    pub metadata: ObjectMeta,
    pub spec: CronJobSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronJobSpec {
    pub workflow_name: String,
    pub user_id: String,
    /// Cron expression. The only trigger field mutable after creation.
    pub schedule: String,
}

/// Present iff the Task declares a `webhook`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub metadata: ObjectMeta,
    pub spec: WebhookSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookSpec {
    pub workflow_name: String,
    pub user_id: String,
    /// Task alias used to address the webhook.
    pub alias: String,
}

/// Present iff the Task declares `email`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailReceiver {
    pub metadata: ObjectMeta,
    pub spec: EmailReceiverSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailReceiverSpec {
    pub workflow_name: String,
    pub user_id: String,
    /// Local part of the inbound address (the Task alias).
    pub alias_user: String,
    pub address: String,
}

/// The materialized trigger resources of one Task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Triggers {
    pub cron_job: Option<CronJob>,
    pub webhook: Option<Webhook>,
    pub email_receiver: Option<EmailReceiver>,
}

macro_rules! trigger_resource {
    ($ty:ty, $kind:expr) => {
        impl Resource for $ty {
            const KIND: ResourceKind = $kind;

            fn meta(&self) -> &ObjectMeta {
                &self.metadata
            }

            fn meta_mut(&mut self) -> &mut ObjectMeta {
                &mut self.metadata
            }

            fn index_fields(&self) -> Vec<(IndexField, String)> {
                vec![
                    (IndexField::UserId, self.spec.user_id.clone()),
                    (IndexField::WorkflowName, self.spec.workflow_name.clone()),
                ]
            }
        }

        impl TaskOwned for $ty {
            fn owner_user_id(&self) -> &str {
                &self.spec.user_id
            }

            fn owner_task_id(&self) -> &str {
                &self.spec.workflow_name
            }
        }
    };
}

trigger_resource!(CronJob, ResourceKind::CronJob);
trigger_resource!(Webhook, ResourceKind::Webhook);
trigger_resource!(EmailReceiver, ResourceKind::EmailReceiver);

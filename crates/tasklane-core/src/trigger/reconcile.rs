//! Applies trigger plans against the object store.

use std::sync::Arc;

use tasklane_types::error::TaskError;
use tasklane_types::resource::ObjectMeta;
use tasklane_types::task::Trigger;
use tasklane_types::trigger::{
    CronJob, CronJobSpec, EmailReceiver, EmailReceiverSpec, Triggers, Webhook, WebhookSpec,
};
use tasklane_types::workflow::Workflow;

use super::{Action, TriggerResource, plan};
use crate::guard::authorize_trigger;
use crate::naming::ResourceNamer;
use crate::store::{MAX_CONFLICT_RETRIES, ObjectStore, get_optional};

/// Converges the cron job, webhook and email receiver of a Task to its
/// declared trigger. Idempotent: reconciling twice with the same trigger
/// writes nothing the second time.
pub struct TriggerReconciler<S: ObjectStore> {
    store: Arc<S>,
    namer: ResourceNamer,
}

impl<S: ObjectStore> TriggerReconciler<S> {
    pub fn new(store: Arc<S>, namer: ResourceNamer) -> Self {
        Self { store, namer }
    }

    /// Converge all three trigger kinds concurrently.
    ///
    /// The first store error other than a lost create or update race aborts
    /// the whole reconciliation.
    pub async fn reconcile(&self, workflow: &Workflow, trigger: &Trigger) -> Result<Triggers, TaskError> {
        let task_id = workflow.metadata.name.as_str();
        let user_id = workflow.spec.user_id.clone();
        let alias = workflow.spec.manifest.alias.clone();

        let cron_job_name = self.namer.cron_job_name(task_id);
        let webhook_name = self.namer.webhook_name(task_id);
        let email_receiver_name = self.namer.email_receiver_name(task_id);

        let cron_job = trigger.schedule().map(|schedule| CronJob {
            metadata: ObjectMeta::named(&cron_job_name),
            spec: CronJobSpec {
                workflow_name: task_id.to_string(),
                user_id: user_id.clone(),
                schedule: schedule.to_string(),
            },
        });
        let webhook = trigger.is_webhook().then(|| Webhook {
            metadata: ObjectMeta::named(&webhook_name),
            spec: WebhookSpec {
                workflow_name: task_id.to_string(),
                user_id: user_id.clone(),
                alias: alias.clone(),
            },
        });
        let email_receiver = trigger.is_email().then(|| EmailReceiver {
            metadata: ObjectMeta::named(&email_receiver_name),
            spec: EmailReceiverSpec {
                workflow_name: task_id.to_string(),
                user_id: user_id.clone(),
                alias_user: alias.clone(),
                address: self.namer.email_address(&alias),
            },
        });

        let (cron_job, webhook, email_receiver) = tokio::try_join!(
            self.converge(workflow, &cron_job_name, cron_job),
            self.converge(workflow, &webhook_name, webhook),
            self.converge(workflow, &email_receiver_name, email_receiver),
        )?;

        Ok(Triggers {
            cron_job,
            webhook,
            email_receiver,
        })
    }

    /// Read the stored trigger resources of a Task without changing them.
    pub async fn observe(&self, workflow: &Workflow) -> Result<Triggers, TaskError> {
        let task_id = workflow.metadata.name.as_str();
        let cron_job_name = self.namer.cron_job_name(task_id);
        let webhook_name = self.namer.webhook_name(task_id);
        let email_receiver_name = self.namer.email_receiver_name(task_id);

        let (cron_job, webhook, email_receiver) = tokio::try_join!(
            self.observe_one::<CronJob>(workflow, &cron_job_name),
            self.observe_one::<Webhook>(workflow, &webhook_name),
            self.observe_one::<EmailReceiver>(workflow, &email_receiver_name),
        )?;

        Ok(Triggers {
            cron_job,
            webhook,
            email_receiver,
        })
    }

    async fn observe_one<R: TriggerResource>(&self, workflow: &Workflow, name: &str) -> Result<Option<R>, TaskError> {
        let observed = get_optional::<S, R>(self.store.as_ref(), name).await?;
        if let Some(observed) = &observed {
            authorize_trigger(observed, workflow)?;
        }
        Ok(observed)
    }

    async fn converge<R: TriggerResource>(
        &self,
        workflow: &Workflow,
        name: &str,
        desired: Option<R>,
    ) -> Result<Option<R>, TaskError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let observed = self.observe_one::<R>(workflow, name).await?;

            let result = match plan(desired.as_ref(), observed) {
                Action::Nothing => return Ok(None),
                Action::Keep(observed) => return Ok(Some(observed)),
                Action::Create(resource) => self.store.create(resource).await.map(|created| {
                    tracing::info!(kind = %R::KIND, name, "created trigger resource");
                    Some(created)
                }),
                Action::Update(resource) => self.store.update(resource).await.map(|updated| {
                    tracing::info!(kind = %R::KIND, name, "updated trigger resource");
                    Some(updated)
                }),
                Action::Delete(resource) => match self.store.delete::<R>(resource.name()).await {
                    Ok(()) => {
                        tracing::info!(kind = %R::KIND, name, "deleted trigger resource");
                        Ok(None)
                    }
                    Err(e) if e.is_not_found() => Ok(None),
                    Err(e) => Err(e),
                },
            };

            match result {
                Ok(resource) => return Ok(resource),
                Err(e) if (e.is_already_exists() || e.is_conflict()) && attempt < MAX_CONFLICT_RETRIES => {
                    tracing::debug!(kind = %R::KIND, name, attempt, error = %e, "trigger write raced, re-planning");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

//! Conversion between the user-facing Task manifest and the engine's
//! Workflow manifest.
//!
//! Both directions are pure. The trigger is not part of the Workflow
//! manifest; going back to a Task it is projected from the trigger
//! resources instead.

use tasklane_types::task::{TaskEmail, TaskIf, TaskManifest, TaskOnDemand, TaskStep, TaskWebhook};
use tasklane_types::trigger::Triggers;
use tasklane_types::workflow::{AgentManifest, If, Step, Thread, WorkflowManifest};

/// Build the Workflow manifest for a Task.
///
/// Starts from the agent's base manifest and unions in the tools of the
/// caller's personal thread, keeping first-seen order. The alias is left
/// empty; it is owned by the stored workflow, not by the edit.
pub fn to_workflow_manifest(
    agent: &AgentManifest,
    thread: Option<&Thread>,
    manifest: &TaskManifest,
) -> WorkflowManifest {
    let mut base = agent.clone();

    if let Some(thread) = thread {
        for tool in &thread.spec.tools {
            if !base.tools.contains(tool) {
                base.tools.push(tool.clone());
            }
        }
    }

    base.name = manifest.name.clone();
    base.description = manifest.description.clone();

    WorkflowManifest {
        agent: base,
        steps: to_workflow_steps(&manifest.steps),
        params: manifest
            .on_demand
            .as_ref()
            .map(|on_demand| on_demand.params.clone())
            .unwrap_or_default(),
        alias: String::new(),
    }
}

/// Project a Workflow manifest and its trigger resources back into a Task
/// manifest.
pub fn to_task_manifest(manifest: &WorkflowManifest, triggers: &Triggers) -> TaskManifest {
    TaskManifest {
        name: manifest.agent.name.clone(),
        description: manifest.agent.description.clone(),
        steps: to_task_steps(&manifest.steps),
        schedule: triggers
            .cron_job
            .as_ref()
            .map(|cron_job| cron_job.spec.schedule.clone()),
        webhook: triggers.webhook.as_ref().map(|_| TaskWebhook {}),
        email: triggers.email_receiver.as_ref().map(|_| TaskEmail {}),
        on_demand: (!manifest.params.is_empty()).then(|| TaskOnDemand {
            params: manifest.params.clone(),
        }),
    }
}

fn to_workflow_steps(steps: &[TaskStep]) -> Vec<Step> {
    steps
        .iter()
        .map(|step| Step {
            id: step.id.clone(),
            step: step.step.clone(),
            branch: step.branch.as_ref().map(|branch| If {
                condition: branch.condition.clone(),
                steps: to_workflow_steps(&branch.steps),
                else_steps: to_workflow_steps(&branch.else_steps),
            }),
        })
        .collect()
}

fn to_task_steps(steps: &[Step]) -> Vec<TaskStep> {
    steps
        .iter()
        .map(|step| TaskStep {
            id: step.id.clone(),
            step: step.step.clone(),
            branch: step.branch.as_ref().map(|branch| TaskIf {
                condition: branch.condition.clone(),
                steps: to_task_steps(&branch.steps),
                else_steps: to_task_steps(&branch.else_steps),
            }),
        })
        .collect()
}

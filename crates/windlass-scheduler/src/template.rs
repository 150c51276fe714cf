//! Automation templates, loaded from the host application's metadata
//! store.

use async_trait::async_trait;
use indexmap::IndexMap;
use windlass_credential::Provider;
use windlass_workflow::Workflow;

use crate::error::SchedulerError;

/// Everything a tick needs besides the user's record: the workflow
/// template, the developer key bag, and the OAuth provider the trigger
/// authenticates against.
#[derive(Debug, Clone)]
pub struct AutomationTemplate {
  pub workflow: Workflow,
  pub developer_keys: IndexMap<String, String>,
  pub provider: Provider,
}

/// Source of automation templates.
#[async_trait]
pub trait TemplateSource: Send + Sync {
  async fn load(&self, automation_id: &str) -> Result<AutomationTemplate, SchedulerError>;
}

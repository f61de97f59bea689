//! Database models for automations.

use crate::api::models::automations::{AutomationCreate, AutomationStatus, AutomationTrigger, AutomationUpdate};
use crate::api::models::summaries::UserSummary;
use crate::types::{AutomationId, UserId};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Database request for creating a new automation
#[derive(Debug, Clone)]
pub struct AutomationCreateDBRequest {
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: AutomationTrigger,
    pub status: AutomationStatus,
    pub conditions: Value,
    pub actions: Value,
    pub owner_id: UserId,
}

impl AutomationCreateDBRequest {
    pub fn new(current_user_id: UserId, api: AutomationCreate) -> Self {
        Self {
            name: api.name,
            description: api.description,
            trigger_type: api.trigger_type.unwrap_or_default(),
            status: api.status.unwrap_or_default(),
            conditions: api.conditions.unwrap_or_else(|| Value::Array(vec![])),
            actions: api.actions.unwrap_or_else(|| Value::Array(vec![])),
            owner_id: api.owner_id.unwrap_or(current_user_id),
        }
    }
}

/// Database request for updating an automation
#[derive(Debug, Clone, Default)]
pub struct AutomationUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub trigger_type: Option<AutomationTrigger>,
    pub status: Option<AutomationStatus>,
    pub conditions: Option<Value>,
    pub actions: Option<Value>,
    pub owner_id: Option<UserId>,
}

impl From<AutomationUpdate> for AutomationUpdateDBRequest {
    fn from(api: AutomationUpdate) -> Self {
        Self {
            name: api.name,
            description: api.description,
            trigger_type: api.trigger_type,
            status: api.status,
            conditions: api.conditions,
            actions: api.actions,
            owner_id: api.owner_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutomationDBResponse {
    pub id: AutomationId,
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: AutomationTrigger,
    pub status: AutomationStatus,
    pub conditions: Value,
    pub actions: Value,
    pub owner_id: UserId,
    pub owner: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

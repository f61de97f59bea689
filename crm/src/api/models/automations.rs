//! API request/response models for automations.
//!
//! Automations are stored workflow definitions: a trigger plus free-form `conditions` and
//! `actions` documents. Nothing in this service executes them.

use super::pagination::{Pagination, paginated_response};
use super::summaries::UserSummary;
use crate::db::models::automations::AutomationDBResponse;
use crate::types::{AutomationId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "automation_trigger", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AutomationTrigger {
    ContactCreated,
    DealStageChanged,
    TaskCompleted,
    TicketCreated,
    FormSubmitted,
    Scheduled,
    #[default]
    Manual,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "automation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AutomationStatus {
    #[default]
    Draft,
    Active,
    Paused,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutomationCreate {
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: Option<AutomationTrigger>,
    pub status: Option<AutomationStatus>,
    /// JSON array, defaults to `[]`
    #[schema(value_type = Option<Vec<Object>>)]
    pub conditions: Option<Value>,
    /// JSON array, defaults to `[]`
    #[schema(value_type = Option<Vec<Object>>)]
    pub actions: Option<Value>,
    /// Defaults to the caller
    #[schema(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutomationUpdate {
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub trigger_type: Option<AutomationTrigger>,
    pub status: Option<AutomationStatus>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub conditions: Option<Value>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub actions: Option<Value>,
    /// Reassigning the owner requires a privileged role
    #[schema(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,
}

impl AutomationCreate {
    /// `conditions` and `actions` must be JSON arrays when present.
    pub fn validate(&self) -> Result<(), String> {
        validate_steps(self.conditions.as_ref(), self.actions.as_ref())
    }
}

impl AutomationUpdate {
    /// `conditions` and `actions` must be JSON arrays when present.
    pub fn validate(&self) -> Result<(), String> {
        validate_steps(self.conditions.as_ref(), self.actions.as_ref())
    }
}

fn validate_steps(conditions: Option<&Value>, actions: Option<&Value>) -> Result<(), String> {
    for (field, value) in [("conditions", conditions), ("actions", actions)] {
        if value.is_some_and(|v| !v.is_array()) {
            return Err(format!("{field} must be a JSON array"));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutomationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AutomationId,
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: AutomationTrigger,
    pub status: AutomationStatus,
    #[schema(value_type = Vec<Object>)]
    pub conditions: Value,
    #[schema(value_type = Vec<Object>)]
    pub actions: Value,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub owner: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

paginated_response!(AutomationListResponse, AutomationResponse, automations);

/// Query parameters for listing automations
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListAutomationsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on name or description
    pub search: Option<String>,

    #[param(value_type = Option<String>, format = "uuid")]
    pub owner_id: Option<UserId>,

    pub trigger_type: Option<AutomationTrigger>,

    pub status: Option<AutomationStatus>,
}

impl From<AutomationDBResponse> for AutomationResponse {
    fn from(db: AutomationDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            description: db.description,
            trigger_type: db.trigger_type,
            status: db.status,
            conditions: db.conditions,
            actions: db.actions,
            owner_id: db.owner_id,
            owner: db.owner,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_steps_must_be_arrays() {
        let create: AutomationCreate = serde_json::from_value(json!({
            "name": "Welcome",
            "triggerType": "contact_created",
            "actions": [{ "type": "send_email", "template": "welcome" }]
        }))
        .unwrap();
        assert!(create.validate().is_ok());
        assert_eq!(create.trigger_type, Some(AutomationTrigger::ContactCreated));

        let update: AutomationUpdate = serde_json::from_value(json!({ "conditions": { "field": "stage" } })).unwrap();
        assert_eq!(update.validate().unwrap_err(), "conditions must be a JSON array");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(AutomationTrigger::default(), AutomationTrigger::Manual);
        assert_eq!(AutomationStatus::default(), AutomationStatus::Draft);
    }
}

//! Compact views of related records, embedded in responses instead of bare foreign keys.

use crate::api::models::deals::DealStage;
use crate::types::{CompanyId, ContactId, DealId, SubscriptionId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Owner, assignee or creator of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: CompanyId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: ContactId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DealSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: DealId,
    pub name: String,
    pub stage: DealStage,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: SubscriptionId,
    pub plan_name: String,
}

/// Build a summary from LEFT JOINed columns, which are all NULL when the reference is unset.
macro_rules! joined_summary {
    ($summary:ident { id: $id:expr, $($field:ident: $value:expr),+ $(,)? }) => {
        match ($id, $($value),+) {
            (Some(id), $(Some($field)),+) => Some($crate::api::models::summaries::$summary { id, $($field),+ }),
            _ => None,
        }
    };
}

pub(crate) use joined_summary;

/// Response for delete endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn deleted(entity: &str) -> Self {
        Self {
            message: format!("{entity} deleted successfully"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_joined_summary_requires_every_column() {
        let id = Uuid::new_v4();
        let present = joined_summary!(CompanySummary { id: Some(id), name: Some("Acme".to_string()) });
        assert_eq!(present, Some(CompanySummary { id, name: "Acme".to_string() }));

        let absent = joined_summary!(CompanySummary { id: None::<Uuid>, name: None::<String> });
        assert_eq!(absent, None);
    }

    #[test]
    fn test_deleted_message() {
        assert_eq!(MessageResponse::deleted("Contact").message, "Contact deleted successfully");
    }
}

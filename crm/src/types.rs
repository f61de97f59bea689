//! Common type definitions and permission system types.
//!
//! This module defines:
//! - Type aliases for entity IDs (UserId, ContactId, etc.)
//! - Permission and authorization types
//! - Resource and operation enums for access control
//!
//! # ID Types
//!
//! All entity IDs are UUIDs wrapped in type aliases so signatures say which table they point at.
//!
//! # Permission System
//!
//! - [`Resource`]: What entity type is being accessed (Contacts, Deals, Tickets, etc.)
//! - [`Operation`]: What action is being performed (Read, Create, Update, Delete)
//! - [`Permission`]: Authorization requirement combining resource and operation
//!
//! ## Operations
//!
//! Operations come in two flavors:
//! - **All**: Unrestricted access to all records (e.g., `UpdateAll`, `DeleteAll`)
//! - **Own**: Restricted to records the user owns, is assigned to, or created (e.g., `UpdateOwn`)
//!
//! ```ignore
//! use crm::types::{Permission, Resource, Operation};
//!
//! let required = Permission::Allow(Resource::Deals, Operation::UpdateAll);
//! ```
//!
//! # Utility Functions
//!
//! - [`abbrev_uuid`]: Abbreviate UUIDs to first 8 chars for logging

use std::fmt;
use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type CompanyId = Uuid;
pub type ContactId = Uuid;
pub type DealId = Uuid;
pub type TaskId = Uuid;
pub type ActivityId = Uuid;
pub type CampaignId = Uuid;
pub type AutomationId = Uuid;
pub type TicketId = Uuid;
pub type SubscriptionId = Uuid;
pub type PaymentId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

// Operations that can be performed on resources
// *-All means unrestricted access, *-Own means restricted to own records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAll,
    CreateOwn,
    ReadAll,
    ReadOwn,
    UpdateAll,
    UpdateOwn,
    DeleteAll,
    DeleteOwn,
}

impl Operation {
    /// The unrestricted counterpart of an `*Own` operation.
    pub fn widened(self) -> Self {
        match self {
            Operation::CreateOwn => Operation::CreateAll,
            Operation::ReadOwn => Operation::ReadAll,
            Operation::UpdateOwn => Operation::UpdateAll,
            Operation::DeleteOwn => Operation::DeleteAll,
            other => other,
        }
    }
}

// Resources that can be operated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Companies,
    Contacts,
    Deals,
    Tasks,
    Activities,
    Campaigns,
    Automations,
    Tickets,
    Subscriptions,
    Payments,
    Dashboard,
}

impl Resource {
    /// Resources holding CRM records, as opposed to accounts or aggregates.
    pub const RECORDS: [Resource; 10] = [
        Resource::Companies,
        Resource::Contacts,
        Resource::Deals,
        Resource::Tasks,
        Resource::Activities,
        Resource::Campaigns,
        Resource::Automations,
        Resource::Tickets,
        Resource::Subscriptions,
        Resource::Payments,
    ];

    pub fn is_record(self) -> bool {
        Self::RECORDS.contains(&self)
    }
}

// Permission types for authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    /// Simple permission: (Resource, Operation)
    Allow(Resource, Operation),
    /// Logical combinator
    Any(Vec<Permission>),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateAll | Operation::CreateOwn => write!(f, "Create"),
            Operation::ReadAll | Operation::ReadOwn => write!(f, "Read"),
            Operation::UpdateAll | Operation::UpdateOwn => write!(f, "Update"),
            Operation::DeleteAll | Operation::DeleteOwn => write!(f, "Delete"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Users => "users",
            Resource::Companies => "companies",
            Resource::Contacts => "contacts",
            Resource::Deals => "deals",
            Resource::Tasks => "tasks",
            Resource::Activities => "activities",
            Resource::Campaigns => "campaigns",
            Resource::Automations => "automations",
            Resource::Tickets => "tickets",
            Resource::Subscriptions => "subscriptions",
            Resource::Payments => "payments",
            Resource::Dashboard => "dashboard",
        };
        f.write_str(name)
    }
}

//! Business counters for CRM records.
//!
//! Recorded through the `metrics` facade; they appear at `/internal/metrics` next to the HTTP
//! metrics once the Prometheus recorder from `axum-prometheus` is installed. Without a recorder
//! the calls are no-ops.

use metrics::counter;

use crate::types::Resource;

/// Count a record created through the API.
pub fn record_created(resource: Resource) {
    counter!("crm_records_created_total", "resource" => resource.to_string()).increment(1);
}

/// Count a record deleted through the API.
pub fn record_deleted(resource: Resource) {
    counter!("crm_records_deleted_total", "resource" => resource.to_string()).increment(1);
}

/// Count a login attempt by outcome (`success`, `invalid_credentials`, `inactive`).
pub fn record_login(outcome: &'static str) {
    counter!("crm_logins_total", "outcome" => outcome).increment(1);
}

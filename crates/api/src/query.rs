//! Query-string parameter types shared by handlers.

use polychat_core::types::DbId;
use serde::Deserialize;

/// Query parameters for `GET /messages/history`.
///
/// Every field is optional at the extractor level so that a missing
/// `target_id` is reported as a validation error rather than an extractor
/// rejection.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub target_id: Option<DbId>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

//! Handlers for the `/messages` resource.

use axum::extract::{Query, State};
use axum::Json;
use polychat_core::error::CoreError;
use polychat_core::history::{validate_pagination, HistoryPage};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::HistoryParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/messages/history?target_id=&page=&page_size=
///
/// The conversation between the caller and `target_id`, newest first.
pub async fn history(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<DataResponse<HistoryPage>>> {
    let target_id = params
        .target_id
        .ok_or_else(|| AppError::BadRequest("target_id is required".into()))?;

    let (page, page_size) = validate_pagination(params.page, params.page_size)
        .map_err(|e| AppError::Core(CoreError::Validation(e)))?;

    let result = state
        .history
        .find_between(user.user_id, target_id, page, page_size)
        .await?;

    Ok(Json(DataResponse { data: result }))
}

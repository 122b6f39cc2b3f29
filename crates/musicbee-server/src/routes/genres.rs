use axum::extract::State;
use axum::response::IntoResponse;

use super::AppJson;
use crate::SharedState;
use crate::error::ApiResult;

pub async fn list(State(state): State<SharedState>) -> ApiResult<impl IntoResponse> {
    let genres = state.store.all_genres().await?;
    Ok(AppJson(genres))
}

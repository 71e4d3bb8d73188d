use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes exempt from the global request timeout.
///
/// An encode legitimately runs for minutes (its bound is
/// `EXEC_TIMEOUT_SECS` at the executor) and a large upload can outlast
/// the HTTP timeout on a slow link, so none of these go behind the
/// timeout layer.
pub fn untimed_router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(jobs::upload))
        .route("/upload_file", post(jobs::upload_file))
        .route("/process", post(jobs::process))
}

/// Quick routes that sit behind the global request timeout.
pub fn timed_router() -> Router<AppState> {
    Router::new().route("/download/{job_id}/{filename}", get(jobs::download))
}

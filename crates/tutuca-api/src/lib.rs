pub mod applications;
pub mod auth;
pub mod campaigns;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod middleware;


use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};
use tracing::error;

use tutuca_db::Database;

pub use crate::auth::{AppState, AppStateInner};
pub use crate::error::ApiError;

/// Builds every route. CORS and request tracing are layered on by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/login", post(auth::sign_in))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::sign_out))
        .route("/auth/user", get(auth::current_user))
        .route(
            "/campaigns",
            get(campaigns::list_active_campaigns).post(campaigns::create_campaign),
        )
        .route("/campaigns/mine", get(campaigns::list_my_campaigns))
        .route("/campaigns/{campaign_id}", get(campaigns::get_campaign))
        .route("/campaigns/{campaign_id}/status", patch(campaigns::update_campaign_status))
        .route(
            "/campaigns/{campaign_id}/applications",
            get(applications::list_campaign_applications).post(applications::apply_to_campaign),
        )
        .route("/applications/mine", get(applications::list_my_applications))
        .route("/applications/{application_id}", patch(applications::decide_application))
        .route("/dashboard/brand", get(dashboard::brand_stats))
        .route("/dashboard/influencer", get(dashboard::influencer_stats))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Runs a blocking database call off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("database task failed: {}", e)
        })?
}

/// Converts storage rows into API models, failing on the first corrupt row.
pub(crate) fn into_models<R, M>(rows: Vec<R>) -> anyhow::Result<Vec<M>>
where
    M: TryFrom<R, Error = anyhow::Error>,
{
    rows.into_iter().map(M::try_from).collect()
}

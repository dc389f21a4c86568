use axum::{Extension, Json, extract::State};

use tutuca_types::api::{BrandStats, Claims, InfluencerStats};
use tutuca_types::models::{CampaignStatus, UserType};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::require_user_type;
use crate::with_db;

/// GET /dashboard/brand
///
/// Reach and ROI are not tracked anywhere, so they are reported as unknown.
pub async fn brand_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<BrandStats>, ApiError> {
    require_user_type(&claims, UserType::Brand, "view brand stats")?;

    let brand_id = claims.sub.to_string();
    let (active_campaigns, total_influencers) = with_db(&state, move |db| {
        let active = db.count_campaigns_for_brand(&brand_id, CampaignStatus::Active.as_str())?;
        let influencers = db.count_accepted_for_brand(&brand_id)?;
        Ok((active, influencers))
    })
    .await?;

    Ok(Json(BrandStats {
        active_campaigns,
        total_influencers,
        total_reach: None,
        avg_roi: None,
    }))
}

/// GET /dashboard/influencer
pub async fn influencer_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<InfluencerStats>, ApiError> {
    require_user_type(&claims, UserType::Influencer, "view influencer stats")?;

    let influencer_id = claims.sub.to_string();
    let (accepted, pending, earnings) =
        with_db(&state, move |db| db.influencer_totals(&influencer_id)).await?;

    Ok(Json(InfluencerStats {
        active_campaigns: accepted,
        pending_applications: pending,
        earnings,
        rating: None,
        total_reach: None,
    }))
}

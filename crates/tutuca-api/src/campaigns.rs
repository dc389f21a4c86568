use std::collections::HashSet;

use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;
use uuid::Uuid;

use tutuca_db::models::NewCampaign;
use tutuca_types::api::{CampaignListing, Claims, CreateCampaignRequest, UpdateCampaignStatusRequest};
use tutuca_types::models::{Campaign, CampaignStatus, UserType};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::require_user_type;
use crate::{into_models, with_db};

/// POST /campaigns: a brand publishes a new campaign. It goes live at once.
pub async fn create_campaign(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_user_type(&claims, UserType::Brand, "create campaigns")?;
    validate_campaign(&req)?;

    let requirements = serde_json::to_string(&req.requirements).map_err(anyhow::Error::from)?;
    let campaign_id = Uuid::new_v4().to_string();
    let brand_id = claims.sub.to_string();

    let row = with_db(&state, move |db| {
        db.insert_campaign(&NewCampaign {
            id: &campaign_id,
            brand_id: &brand_id,
            title: req.title.trim(),
            description: req.description.trim(),
            budget: req.budget,
            start_date: &req.start_date.format("%Y-%m-%d").to_string(),
            end_date: &req.end_date.format("%Y-%m-%d").to_string(),
            requirements: &requirements,
            status: CampaignStatus::Active.as_str(),
        })
    })
    .await?;

    let campaign = Campaign::try_from(row)?;
    info!(
        "Campaign {} '{}' created by {} with budget {}",
        campaign.id, campaign.title, claims.email, campaign.budget
    );

    Ok((StatusCode::CREATED, Json(campaign)))
}

/// GET /campaigns: every active campaign, newest first. Influencers also
/// learn which ones they already applied to.
pub async fn list_active_campaigns(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<CampaignListing>>, ApiError> {
    let viewer = claims.sub.to_string();
    let is_influencer = claims.user_type == UserType::Influencer;

    let (rows, applied) = with_db(&state, move |db| {
        let rows = db.list_campaigns_by_status(CampaignStatus::Active.as_str())?;
        let applied = if is_influencer {
            db.applied_campaign_ids(&viewer)?
        } else {
            HashSet::new()
        };
        Ok((rows, applied))
    })
    .await?;

    let listings = rows
        .into_iter()
        .map(|row| -> anyhow::Result<CampaignListing> {
            let applied = applied.contains(&row.id);
            Ok(CampaignListing {
                campaign: Campaign::try_from(row)?,
                applied,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(listings))
}

/// GET /campaigns/mine: the caller's own campaigns in any status.
pub async fn list_my_campaigns(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Campaign>>, ApiError> {
    require_user_type(&claims, UserType::Brand, "own campaigns")?;

    let brand_id = claims.sub.to_string();
    let rows = with_db(&state, move |db| db.list_campaigns_by_brand(&brand_id)).await?;
    Ok(Json(into_models(rows)?))
}

pub async fn get_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Campaign>, ApiError> {
    Ok(Json(load_campaign(&state, campaign_id).await?))
}

/// PATCH /campaigns/{id}/status: only the owning brand may pause, resume or
/// complete a campaign.
pub async fn update_campaign_status(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateCampaignStatusRequest>,
) -> Result<Json<Campaign>, ApiError> {
    let mut campaign = load_campaign(&state, campaign_id).await?;
    require_owner(&campaign, &claims)?;

    let id = campaign_id.to_string();
    with_db(&state, move |db| db.update_campaign_status(&id, req.status.as_str())).await?;

    info!("Campaign {} status {} -> {}", campaign.id, campaign.status, req.status);
    campaign.status = req.status;
    Ok(Json(campaign))
}

pub(crate) async fn load_campaign(state: &AppState, campaign_id: Uuid) -> Result<Campaign, ApiError> {
    let id = campaign_id.to_string();
    let row = with_db(state, move |db| db.get_campaign(&id))
        .await?
        .ok_or(ApiError::NotFound("campaign"))?;
    Ok(Campaign::try_from(row)?)
}

pub(crate) fn require_owner(campaign: &Campaign, claims: &Claims) -> Result<(), ApiError> {
    if campaign.brand_id == claims.sub {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Only the brand that owns this campaign can do that".into(),
        ))
    }
}

fn validate_campaign(req: &CreateCampaignRequest) -> Result<(), ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".into()));
    }
    if req.description.trim().is_empty() {
        return Err(ApiError::BadRequest("description is required".into()));
    }
    if !req.budget.is_finite() || req.budget < 0.0 {
        return Err(ApiError::BadRequest("budget must be a non-negative number".into()));
    }
    if req.end_date < req.start_date {
        return Err(ApiError::BadRequest("end_date must not be before start_date".into()));
    }
    Ok(())
}

use axum::{Extension, body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{info, warn};
use uuid::Uuid;

use tutuca_db::is_unique_violation;
use tutuca_db::models::NewApplication;
use tutuca_types::api::{
    ApplicationWithCampaign, ApplyRequest, CampaignSummary, Claims, DecideApplicationRequest,
};
use tutuca_types::models::{Application, ApplicationStatus, CampaignStatus, UserType};

use crate::auth::AppState;
use crate::campaigns::{load_campaign, require_owner};
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::require_user_type;
use crate::{into_models, with_db};

/// Proposal used when the influencer does not write one.
pub const DEFAULT_PROPOSAL: &str = "Me encantaría participar en esta campaña";

/// Asking price used when the influencer does not quote one.
pub const DEFAULT_PRICE: f64 = 250.0;

/// POST /campaigns/{id}/applications: an influencer bids on an active
/// campaign. The body is optional; missing fields take the defaults above.
pub async fn apply_to_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    require_user_type(&claims, UserType::Influencer, "apply to campaigns")?;

    let req: ApplyRequest = if body.is_empty() {
        ApplyRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    let proposal = req
        .proposal
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PROPOSAL)
        .to_string();
    let price = req.price.unwrap_or(DEFAULT_PRICE);
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::BadRequest("price must be a non-negative number".into()));
    }

    let campaign = load_campaign(&state, campaign_id).await?;
    if campaign.status != CampaignStatus::Active {
        return Err(ApiError::Conflict(format!(
            "Campaign is {} and not accepting applications",
            campaign.status
        )));
    }

    let application_id = Uuid::new_v4().to_string();
    let cid = campaign_id.to_string();
    let influencer_id = claims.sub.to_string();
    let row = with_db(&state, move |db| {
        db.insert_application(&NewApplication {
            id: &application_id,
            campaign_id: &cid,
            influencer_id: &influencer_id,
            proposal: &proposal,
            price,
        })
    })
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            warn!("{} applied twice to campaign {}", claims.email, campaign_id);
            ApiError::Conflict("You have already applied to this campaign".into())
        } else {
            e.into()
        }
    })?;

    let application = Application::try_from(row)?;
    info!(
        "Application {} from {} to campaign {} at {}",
        application.id, claims.email, campaign_id, application.price
    );

    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /applications/mine: the influencer's bids with campaign summaries.
pub async fn list_my_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ApplicationWithCampaign>>, ApiError> {
    require_user_type(&claims, UserType::Influencer, "list their applications")?;

    let influencer_id = claims.sub.to_string();
    let rows = with_db(&state, move |db| db.list_applications_by_influencer(&influencer_id)).await?;

    let applications = rows
        .into_iter()
        .map(|row| -> anyhow::Result<ApplicationWithCampaign> {
            let app = Application::try_from(row.application)?;
            Ok(ApplicationWithCampaign {
                id: app.id,
                campaign_id: app.campaign_id,
                proposal: app.proposal,
                price: app.price,
                status: app.status,
                created_at: app.created_at,
                campaign: CampaignSummary {
                    title: row.campaign_title,
                    description: row.campaign_description,
                },
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(applications))
}

/// GET /campaigns/{id}/applications: bids received, visible to the owner only.
pub async fn list_campaign_applications(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Application>>, ApiError> {
    let campaign = load_campaign(&state, campaign_id).await?;
    require_owner(&campaign, &claims)?;

    let cid = campaign_id.to_string();
    let rows = with_db(&state, move |db| db.list_applications_by_campaign(&cid)).await?;
    Ok(Json(into_models(rows)?))
}

/// PATCH /applications/{id}: the campaign owner accepts or rejects a
/// pending application. Decisions are final.
pub async fn decide_application(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DecideApplicationRequest>,
) -> Result<Json<Application>, ApiError> {
    if req.status == ApplicationStatus::Pending {
        return Err(ApiError::BadRequest("status must be accepted or rejected".into()));
    }

    let id = application_id.to_string();
    let row = with_db(&state, move |db| db.get_application(&id))
        .await?
        .ok_or(ApiError::NotFound("application"))?;
    let mut application = Application::try_from(row)?;

    let campaign = load_campaign(&state, application.campaign_id).await?;
    require_owner(&campaign, &claims)?;

    if !application.status.can_transition_to(req.status) {
        return Err(ApiError::Conflict(format!(
            "Application is already {}",
            application.status
        )));
    }

    let id = application_id.to_string();
    let from = application.status;
    let to = req.status;
    let changed =
        with_db(&state, move |db| db.transition_application(&id, from.as_str(), to.as_str())).await?;
    if !changed {
        return Err(ApiError::Conflict("Application was decided by another request".into()));
    }

    info!(
        "Application {} on campaign {} {} by {}",
        application.id, campaign.id, to, claims.email
    );
    application.status = to;
    Ok(Json(application))
}

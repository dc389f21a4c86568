use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    ApplicationStatus, Campaign, CampaignStatus, Profile, Requirements, UserType,
};

// -- JWT Claims --

/// Session token claims. `sid` names the row in `sessions` so sign-out can
/// revoke a token before it expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub sid: Uuid,
    pub email: String,
    pub user_type: UserType,
    pub exp: usize,
}

// -- Auth --

/// Credentials are checked with `validate()` after the email is trimmed and
/// lower-cased. Password length counts characters, not bytes.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SignUpRequest {
    #[validate(email(message = "Unable to validate email address: invalid format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password should be at least 6 characters"))]
    pub password: String,
    pub data: SignUpMetadata,
}

/// Profile fields supplied alongside the credentials at sign-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignUpMetadata {
    pub user_type: UserType,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub profile: Profile,
    /// Dashboard route for the profile's user type.
    pub redirect: String,
}

// -- Campaigns --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCampaignRequest {
    pub title: String,
    pub description: String,
    pub budget: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub requirements: Requirements,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCampaignStatusRequest {
    pub status: CampaignStatus,
}

/// A campaign as shown in the browse view. `applied` is only meaningful for
/// influencers; brands always see `false`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CampaignListing {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub applied: bool,
}

// -- Applications --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyRequest {
    #[serde(default)]
    pub proposal: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecideApplicationRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub title: String,
    pub description: String,
}

/// An influencer's application together with the campaign it targets.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApplicationWithCampaign {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub proposal: String,
    pub price: f64,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub campaign: CampaignSummary,
}

// -- Dashboards --

/// Metrics that are never measured stay `None` and serialize as `null`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BrandStats {
    pub active_campaigns: u64,
    pub total_influencers: u64,
    pub total_reach: Option<u64>,
    pub avg_roi: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InfluencerStats {
    pub active_campaigns: u64,
    pub pending_applications: u64,
    pub earnings: f64,
    pub rating: Option<f64>,
    pub total_reach: Option<u64>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

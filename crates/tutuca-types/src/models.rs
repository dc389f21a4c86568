use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Returned when a stored or submitted enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

// -- Accounts --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Brand,
    Influencer,
}

string_enum!(UserType, "user type", {
    Brand => "brand",
    Influencer => "influencer",
});

impl UserType {
    /// Dashboard a freshly signed-in user is sent to.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Self::Brand => "/brand",
            Self::Influencer => "/influencer",
        }
    }

    /// Display name used when sign-up omits `full_name`.
    pub fn default_full_name(&self) -> &'static str {
        match self {
            Self::Brand => "Brand User",
            Self::Influencer => "Influencer User",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub user_type: UserType,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Campaigns --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Paused,
    Completed,
}

string_enum!(CampaignStatus, "campaign status", {
    Active => "active",
    Paused => "paused",
    Completed => "completed",
});

/// Deliverable formats a brand can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "Instagram Post")]
    InstagramPost,
    #[serde(rename = "Instagram Reel")]
    InstagramReel,
    #[serde(rename = "Instagram Story")]
    InstagramStory,
    #[serde(rename = "TikTok Video")]
    TikTokVideo,
    #[serde(rename = "YouTube Video")]
    YouTubeVideo,
    #[serde(rename = "Blog Post")]
    BlogPost,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub content_type: Vec<ContentType>,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub title: String,
    pub description: String,
    pub budget: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub requirements: Requirements,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
}

// -- Applications --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

string_enum!(ApplicationStatus, "application status", {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
});

impl ApplicationStatus {
    /// Only a pending application may be decided, and only into a final state.
    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted) | (Self::Pending, Self::Rejected)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub influencer_id: Uuid,
    pub proposal: String,
    pub price: f64,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

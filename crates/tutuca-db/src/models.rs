//! Database row types. These map directly to SQLite rows and are converted
//! into `tutuca-types` models at the edge of the storage layer.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

use tutuca_types::models::{Application, Campaign, Profile, Requirements};

#[derive(Debug)]
pub struct IdentityRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub metadata: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct ProfileRow {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub user_type: String,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug)]
pub struct CampaignRow {
    pub id: String,
    pub brand_id: String,
    pub title: String,
    pub description: String,
    pub budget: f64,
    pub start_date: String,
    pub end_date: String,
    pub requirements: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct ApplicationRow {
    pub id: String,
    pub campaign_id: String,
    pub influencer_id: String,
    pub proposal: String,
    pub price: f64,
    pub status: String,
    pub created_at: String,
}

/// An application joined with the title and description of its campaign.
#[derive(Debug)]
pub struct ApplicationCampaignRow {
    pub application: ApplicationRow,
    pub campaign_title: String,
    pub campaign_description: String,
}

// -- Inserts --

pub struct NewProfile<'a> {
    pub full_name: Option<&'a str>,
    pub company_name: Option<&'a str>,
    pub user_type: &'a str,
}

pub struct NewCampaign<'a> {
    pub id: &'a str,
    pub brand_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub budget: f64,
    pub start_date: &'a str,
    pub end_date: &'a str,
    pub requirements: &'a str,
    pub status: &'a str,
}

pub struct NewApplication<'a> {
    pub id: &'a str,
    pub campaign_id: &'a str,
    pub influencer_id: &'a str,
    pub proposal: &'a str,
    pub price: f64,
}

// -- Row mapping --

pub(crate) const PROFILE_COLUMNS: &str =
    "id, email, full_name, company_name, user_type, avatar_url, created_at";

pub(crate) const CAMPAIGN_COLUMNS: &str =
    "id, brand_id, title, description, budget, start_date, end_date, requirements, status, created_at";

pub(crate) const APPLICATION_COLUMNS: &str =
    "id, campaign_id, influencer_id, proposal, price, status, created_at";

impl ProfileRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            full_name: row.get(2)?,
            company_name: row.get(3)?,
            user_type: row.get(4)?,
            avatar_url: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl CampaignRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            brand_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            budget: row.get(4)?,
            start_date: row.get(5)?,
            end_date: row.get(6)?,
            requirements: row.get(7)?,
            status: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

impl ApplicationRow {
    /// Reads the application columns starting at `offset`.
    pub(crate) fn from_row_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            campaign_id: row.get(offset + 1)?,
            influencer_id: row.get(offset + 2)?,
            proposal: row.get(offset + 3)?,
            price: row.get(offset + 4)?,
            status: row.get(offset + 5)?,
            created_at: row.get(offset + 6)?,
        })
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Self::from_row_at(row, 0)
    }
}

// -- Conversions --

pub fn parse_uuid(value: &str) -> Result<Uuid> {
    value.parse().with_context(|| format!("corrupt id '{}'", value))
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand through the sqlite shell use datetime('now').
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", value))
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").with_context(|| format!("corrupt date '{}'", value))
}

impl TryFrom<ProfileRow> for Profile {
    type Error = anyhow::Error;

    fn try_from(row: ProfileRow) -> Result<Self> {
        Ok(Self {
            id: parse_uuid(&row.id)?,
            email: row.email,
            full_name: row.full_name,
            company_name: row.company_name,
            user_type: row.user_type.parse()?,
            avatar_url: row.avatar_url,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = anyhow::Error;

    fn try_from(row: CampaignRow) -> Result<Self> {
        let requirements: Requirements = serde_json::from_str(&row.requirements)
            .with_context(|| format!("corrupt requirements on campaign '{}'", row.id))?;

        Ok(Self {
            id: parse_uuid(&row.id)?,
            brand_id: parse_uuid(&row.brand_id)?,
            title: row.title,
            description: row.description,
            budget: row.budget,
            start_date: parse_date(&row.start_date)?,
            end_date: parse_date(&row.end_date)?,
            requirements,
            status: row.status.parse()?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl TryFrom<ApplicationRow> for Application {
    type Error = anyhow::Error;

    fn try_from(row: ApplicationRow) -> Result<Self> {
        Ok(Self {
            id: parse_uuid(&row.id)?,
            campaign_id: parse_uuid(&row.campaign_id)?,
            influencer_id: parse_uuid(&row.influencer_id)?,
            proposal: row.proposal,
            price: row.price,
            status: row.status.parse()?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_timestamp_forms() {
        let a = parse_timestamp("2026-03-01T10:20:30.456Z").unwrap();
        let b = parse_timestamp("2026-03-01 10:20:30").unwrap();
        assert_eq!(a.timestamp(), b.timestamp());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn corrupt_status_fails_conversion() {
        let row = ApplicationRow {
            id: Uuid::new_v4().to_string(),
            campaign_id: Uuid::new_v4().to_string(),
            influencer_id: Uuid::new_v4().to_string(),
            proposal: "hi".into(),
            price: 10.0,
            status: "maybe".into(),
            created_at: "2026-03-01T10:20:30.456Z".into(),
        };
        assert!(Application::try_from(row).is_err());
    }
}

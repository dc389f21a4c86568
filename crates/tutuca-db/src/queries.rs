use std::collections::HashSet;

use crate::models::{
    APPLICATION_COLUMNS, ApplicationCampaignRow, ApplicationRow, CAMPAIGN_COLUMNS, CampaignRow,
    IdentityRow, NewApplication, NewCampaign, NewProfile, PROFILE_COLUMNS, ProfileRow,
};
use crate::{Database, NOW};
use anyhow::Result;
use rusqlite::Connection;

/// Tables `check_tables` probes, in the order they are reported.
pub const CHECKED_TABLES: &[&str] = &["profiles", "campaigns", "applications"];

impl Database {
    // -- Identities --

    /// Creates an identity and its profile in one transaction.
    pub fn create_account(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        metadata: &str,
        profile: &NewProfile<'_>,
    ) -> Result<ProfileRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO identities (id, email, password, metadata) VALUES (?1, ?2, ?3, ?4)",
                (id, email, password_hash, metadata),
            )?;
            tx.execute(
                "INSERT INTO profiles (id, email, full_name, company_name, user_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, email, profile.full_name, profile.company_name, profile.user_type],
            )?;
            let row = query_profile(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("profile {} vanished inside its own transaction", id))?;
            tx.commit()?;
            Ok(row)
        })
    }

    pub fn get_identity_by_email(&self, email: &str) -> Result<Option<IdentityRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, password, metadata, created_at FROM identities WHERE email = ?1",
                [email],
                |row| {
                    Ok(IdentityRow {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        password: row.get(2)?,
                        metadata: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Sessions --

    pub fn create_session(&self, id: &str, identity_id: &str, expires_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, identity_id, expires_at) VALUES (?1, ?2, ?3)",
                (id, identity_id, expires_at),
            )?;
            Ok(())
        })
    }

    /// A session is live until it expires or is revoked.
    pub fn is_session_active(&self, id: &str, identity_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let live: Option<i64> = conn
                .query_row(
                    &format!(
                        "SELECT 1 FROM sessions
                         WHERE id = ?1 AND identity_id = ?2
                           AND revoked_at IS NULL AND expires_at > {NOW}"
                    ),
                    [id, identity_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(live.is_some())
        })
    }

    /// Returns false when the session was unknown or already revoked.
    pub fn revoke_session(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                &format!("UPDATE sessions SET revoked_at = {NOW} WHERE id = ?1 AND revoked_at IS NULL"),
                [id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Profiles --

    pub fn get_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, id))
    }

    // -- Campaigns --

    pub fn insert_campaign(&self, campaign: &NewCampaign<'_>) -> Result<CampaignRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO campaigns
                        (id, brand_id, title, description, budget, start_date, end_date, requirements, status)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     RETURNING {CAMPAIGN_COLUMNS}"
                ),
                rusqlite::params![
                    campaign.id,
                    campaign.brand_id,
                    campaign.title,
                    campaign.description,
                    campaign.budget,
                    campaign.start_date,
                    campaign.end_date,
                    campaign.requirements,
                    campaign.status,
                ],
                CampaignRow::from_row,
            )?;
            Ok(row)
        })
    }

    pub fn get_campaign(&self, id: &str) -> Result<Option<CampaignRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"),
                [id],
                CampaignRow::from_row,
            )
            .optional()
        })
    }

    /// Campaigns in `status`, newest first.
    pub fn list_campaigns_by_status(&self, status: &str) -> Result<Vec<CampaignRow>> {
        self.with_conn(|conn| {
            query_campaigns(
                conn,
                &format!(
                    "SELECT {CAMPAIGN_COLUMNS} FROM campaigns
                     WHERE status = ?1
                     ORDER BY created_at DESC, rowid DESC"
                ),
                status,
            )
        })
    }

    /// Every campaign a brand owns, newest first.
    pub fn list_campaigns_by_brand(&self, brand_id: &str) -> Result<Vec<CampaignRow>> {
        self.with_conn(|conn| {
            query_campaigns(
                conn,
                &format!(
                    "SELECT {CAMPAIGN_COLUMNS} FROM campaigns
                     WHERE brand_id = ?1
                     ORDER BY created_at DESC, rowid DESC"
                ),
                brand_id,
            )
        })
    }

    pub fn update_campaign_status(&self, id: &str, status: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed =
                conn.execute("UPDATE campaigns SET status = ?2 WHERE id = ?1", (id, status))?;
            Ok(changed > 0)
        })
    }

    pub fn count_campaigns_for_brand(&self, brand_id: &str, status: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM campaigns WHERE brand_id = ?1 AND status = ?2",
                (brand_id, status),
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    // -- Applications --

    pub fn insert_application(&self, application: &NewApplication<'_>) -> Result<ApplicationRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO applications (id, campaign_id, influencer_id, proposal, price)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     RETURNING {APPLICATION_COLUMNS}"
                ),
                rusqlite::params![
                    application.id,
                    application.campaign_id,
                    application.influencer_id,
                    application.proposal,
                    application.price,
                ],
                ApplicationRow::from_row,
            )?;
            Ok(row)
        })
    }

    pub fn get_application(&self, id: &str) -> Result<Option<ApplicationRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?1"),
                [id],
                ApplicationRow::from_row,
            )
            .optional()
        })
    }

    /// Campaign ids the influencer has already applied to.
    pub fn applied_campaign_ids(&self, influencer_id: &str) -> Result<HashSet<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT campaign_id FROM applications WHERE influencer_id = ?1")?;
            let ids = stmt
                .query_map([influencer_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<HashSet<_>, _>>()?;
            Ok(ids)
        })
    }

    /// An influencer's applications with their campaigns, newest first.
    pub fn list_applications_by_influencer(
        &self,
        influencer_id: &str,
    ) -> Result<Vec<ApplicationCampaignRow>> {
        self.with_conn(|conn| {
            // JOIN campaigns to fetch the summary in a single query
            let mut stmt = conn.prepare(
                "SELECT a.id, a.campaign_id, a.influencer_id, a.proposal, a.price, a.status, a.created_at,
                        c.title, c.description
                 FROM applications a
                 JOIN campaigns c ON a.campaign_id = c.id
                 WHERE a.influencer_id = ?1
                 ORDER BY a.created_at DESC, a.rowid DESC",
            )?;

            let rows = stmt
                .query_map([influencer_id], |row| {
                    Ok(ApplicationCampaignRow {
                        application: ApplicationRow::from_row_at(row, 0)?,
                        campaign_title: row.get(7)?,
                        campaign_description: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn list_applications_by_campaign(&self, campaign_id: &str) -> Result<Vec<ApplicationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {APPLICATION_COLUMNS} FROM applications
                 WHERE campaign_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map([campaign_id], ApplicationRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Compare-and-set on the status column. Returns false if the application
    /// was no longer in `from`.
    pub fn transition_application(&self, id: &str, from: &str, to: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE applications SET status = ?3 WHERE id = ?1 AND status = ?2",
                (id, from, to),
            )?;
            Ok(changed > 0)
        })
    }

    /// Accepted applications across all of a brand's campaigns.
    pub fn count_accepted_for_brand(&self, brand_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*)
                 FROM applications a
                 JOIN campaigns c ON a.campaign_id = c.id
                 WHERE c.brand_id = ?1 AND a.status = 'accepted'",
                [brand_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// (accepted, pending, sum of accepted prices) for one influencer.
    pub fn influencer_totals(&self, influencer_id: &str) -> Result<(u64, u64, f64)> {
        self.with_conn(|conn| {
            let (accepted, pending, earnings): (i64, i64, f64) = conn.query_row(
                "SELECT
                    COALESCE(SUM(status = 'accepted'), 0),
                    COALESCE(SUM(status = 'pending'), 0),
                    COALESCE(SUM(CASE WHEN status = 'accepted' THEN price END), 0.0)
                 FROM applications
                 WHERE influencer_id = ?1",
                [influencer_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
            Ok((accepted as u64, pending as u64, earnings))
        })
    }

    // -- Health --

    /// Row counts for the core tables; fails if any of them is unreadable.
    pub fn check_tables(&self) -> Result<Vec<(&'static str, u64)>> {
        self.with_conn(|conn| {
            CHECKED_TABLES
                .iter()
                .map(|table| -> Result<(&'static str, u64)> {
                    let count: i64 =
                        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
                    Ok((*table, count as u64))
                })
                .collect()
        })
    }
}

fn query_profile(conn: &Connection, id: &str) -> Result<Option<ProfileRow>> {
    conn.query_row(
        &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
        [id],
        ProfileRow::from_row,
    )
    .optional()
}

fn query_campaigns(conn: &Connection, sql: &str, param: &str) -> Result<Vec<CampaignRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([param], CampaignRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;
    use uuid::Uuid;

    fn account(db: &Database, email: &str, user_type: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_account(
            &id,
            email,
            "hash",
            "{}",
            &NewProfile {
                full_name: Some("Test"),
                company_name: None,
                user_type,
            },
        )
        .unwrap();
        id
    }

    fn campaign(db: &Database, brand_id: &str, title: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.insert_campaign(&NewCampaign {
            id: &id,
            brand_id,
            title,
            description: "desc",
            budget: 1000.0,
            start_date: "2026-01-01",
            end_date: "2026-02-01",
            requirements: r#"{"content_type":[],"details":""}"#,
            status: "active",
        })
        .unwrap();
        id
    }

    fn apply(db: &Database, campaign_id: &str, influencer_id: &str) -> Result<ApplicationRow> {
        db.insert_application(&NewApplication {
            id: &Uuid::new_v4().to_string(),
            campaign_id,
            influencer_id,
            proposal: "hello",
            price: 250.0,
        })
    }

    #[test]
    fn create_account_writes_identity_and_profile() {
        let db = Database::open_in_memory().unwrap();
        let id = account(&db, "marca@tutuca.co", "brand");

        let identity = db.get_identity_by_email("marca@tutuca.co").unwrap().unwrap();
        assert_eq!(identity.id, id);
        let profile = db.get_profile(&id).unwrap().unwrap();
        assert_eq!(profile.user_type, "brand");
        assert_eq!(profile.email, "marca@tutuca.co");
    }

    #[test]
    fn duplicate_email_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        account(&db, "dup@tutuca.co", "brand");

        let second = Uuid::new_v4().to_string();
        let err = db
            .create_account(
                &second,
                "dup@tutuca.co",
                "hash",
                "{}",
                &NewProfile { full_name: None, company_name: None, user_type: "influencer" },
            )
            .unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(db.get_profile(&second).unwrap().is_none());
    }

    #[test]
    fn new_campaign_is_the_only_active_row() {
        let db = Database::open_in_memory().unwrap();
        let brand = account(&db, "b@tutuca.co", "brand");
        let id = campaign(&db, &brand, "Summer");

        let active = db.list_campaigns_by_status("active").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, id);
        assert_eq!(active[0].status, "active");
    }

    #[test]
    fn campaigns_are_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let brand = account(&db, "b@tutuca.co", "brand");
        let first = campaign(&db, &brand, "First");
        let second = campaign(&db, &brand, "Second");

        let ids: Vec<String> = db
            .list_campaigns_by_brand(&brand)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn paused_campaigns_leave_the_active_list() {
        let db = Database::open_in_memory().unwrap();
        let brand = account(&db, "b@tutuca.co", "brand");
        let id = campaign(&db, &brand, "Summer");

        assert!(db.update_campaign_status(&id, "paused").unwrap());
        assert!(db.list_campaigns_by_status("active").unwrap().is_empty());
        assert_eq!(db.count_campaigns_for_brand(&brand, "active").unwrap(), 0);
        assert!(!db.update_campaign_status(&Uuid::new_v4().to_string(), "paused").unwrap());
    }

    #[test]
    fn second_application_hits_unique_constraint() {
        let db = Database::open_in_memory().unwrap();
        let brand = account(&db, "b@tutuca.co", "brand");
        let influencer = account(&db, "i@tutuca.co", "influencer");
        let camp = campaign(&db, &brand, "Summer");

        let first = apply(&db, &camp, &influencer).unwrap();
        assert_eq!(first.status, "pending");

        let err = apply(&db, &camp, &influencer).unwrap_err();
        assert!(is_unique_violation(&err));
        assert_eq!(db.list_applications_by_campaign(&camp).unwrap().len(), 1);
    }

    #[test]
    fn transition_only_from_expected_status() {
        let db = Database::open_in_memory().unwrap();
        let brand = account(&db, "b@tutuca.co", "brand");
        let influencer = account(&db, "i@tutuca.co", "influencer");
        let camp = campaign(&db, &brand, "Summer");
        let app = apply(&db, &camp, &influencer).unwrap();

        assert!(db.transition_application(&app.id, "pending", "accepted").unwrap());
        assert!(!db.transition_application(&app.id, "pending", "rejected").unwrap());
        assert_eq!(db.get_application(&app.id).unwrap().unwrap().status, "accepted");
    }

    #[test]
    fn dashboard_counts() {
        let db = Database::open_in_memory().unwrap();
        let brand = account(&db, "b@tutuca.co", "brand");
        let influencer = account(&db, "i@tutuca.co", "influencer");
        let a = campaign(&db, &brand, "A");
        let b = campaign(&db, &brand, "B");

        let accepted = apply(&db, &a, &influencer).unwrap();
        apply(&db, &b, &influencer).unwrap();
        db.transition_application(&accepted.id, "pending", "accepted").unwrap();

        assert_eq!(db.count_accepted_for_brand(&brand).unwrap(), 1);
        assert_eq!(db.influencer_totals(&influencer).unwrap(), (1, 1, 250.0));

        let applied = db.applied_campaign_ids(&influencer).unwrap();
        assert!(applied.contains(&a) && applied.contains(&b));

        let joined = db.list_applications_by_influencer(&influencer).unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].campaign_title, "B");
    }

    #[test]
    fn revoked_sessions_are_inactive() {
        let db = Database::open_in_memory().unwrap();
        let user = account(&db, "s@tutuca.co", "brand");
        let sid = Uuid::new_v4().to_string();
        db.create_session(&sid, &user, "2999-01-01T00:00:00.000Z").unwrap();

        assert!(db.is_session_active(&sid, &user).unwrap());
        assert!(db.revoke_session(&sid).unwrap());
        assert!(!db.is_session_active(&sid, &user).unwrap());
        assert!(!db.revoke_session(&sid).unwrap());
    }

    #[test]
    fn expired_sessions_are_inactive() {
        let db = Database::open_in_memory().unwrap();
        let user = account(&db, "s@tutuca.co", "brand");
        let sid = Uuid::new_v4().to_string();
        db.create_session(&sid, &user, "2000-01-01T00:00:00.000Z").unwrap();
        assert!(!db.is_session_active(&sid, &user).unwrap());
    }

    #[test]
    fn check_tables_reports_counts() {
        let db = Database::open_in_memory().unwrap();
        account(&db, "b@tutuca.co", "brand");
        let counts = db.check_tables().unwrap();
        assert_eq!(counts, vec![("profiles", 1), ("campaigns", 0), ("applications", 0)]);
    }
}

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE identities (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                metadata    TEXT NOT NULL DEFAULT '{}',
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE sessions (
                id          TEXT PRIMARY KEY,
                identity_id TEXT NOT NULL REFERENCES identities(id),
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                expires_at  TEXT NOT NULL,
                revoked_at  TEXT
            );

            CREATE TABLE profiles (
                id            TEXT PRIMARY KEY REFERENCES identities(id),
                email         TEXT NOT NULL,
                full_name     TEXT,
                company_name  TEXT,
                user_type     TEXT NOT NULL CHECK (user_type IN ('brand', 'influencer')),
                avatar_url    TEXT,
                created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE campaigns (
                id            TEXT PRIMARY KEY,
                brand_id      TEXT NOT NULL REFERENCES profiles(id),
                title         TEXT NOT NULL,
                description   TEXT NOT NULL,
                budget        REAL NOT NULL,
                start_date    TEXT NOT NULL,
                end_date      TEXT NOT NULL,
                requirements  TEXT NOT NULL DEFAULT '{}',
                status        TEXT NOT NULL DEFAULT 'active',
                created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_campaigns_status ON campaigns(status, created_at);
            CREATE INDEX idx_campaigns_brand ON campaigns(brand_id, created_at);

            CREATE TABLE applications (
                id             TEXT PRIMARY KEY,
                campaign_id    TEXT NOT NULL REFERENCES campaigns(id),
                influencer_id  TEXT NOT NULL REFERENCES profiles(id),
                proposal       TEXT NOT NULL,
                price          REAL NOT NULL,
                status         TEXT NOT NULL DEFAULT 'pending',
                created_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                UNIQUE(campaign_id, influencer_id)
            );

            CREATE INDEX idx_applications_influencer ON applications(influencer_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rerunning_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use tracing::info;

use bloodbridge_types::BloodGroup;

/// Starting stock per group, applied once to an empty inventory table.
pub const INITIAL_INVENTORY: [(BloodGroup, i64); 8] = [
    (BloodGroup::APos, 25),
    (BloodGroup::ANeg, 12),
    (BloodGroup::BPos, 18),
    (BloodGroup::BNeg, 8),
    (BloodGroup::AbPos, 15),
    (BloodGroup::AbNeg, 5),
    (BloodGroup::OPos, 30),
    (BloodGroup::ONeg, 10),
];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                TEXT PRIMARY KEY,
            full_name         TEXT NOT NULL,
            email             TEXT NOT NULL UNIQUE,
            phone             TEXT NOT NULL,
            phone_normalized  TEXT NOT NULL UNIQUE,
            password          TEXT NOT NULL,
            blood_group       TEXT NOT NULL,
            created_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_users_blood_group
            ON users(blood_group);

        CREATE TABLE IF NOT EXISTS sessions (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL,
            expires_at  TEXT NOT NULL,
            revoked_at  TEXT
        );

        CREATE TABLE IF NOT EXISTS requests (
            id              TEXT PRIMARY KEY,
            requester_id    TEXT NOT NULL REFERENCES users(id),
            blood_group     TEXT NOT NULL,
            location        TEXT NOT NULL,
            quantity        INTEGER NOT NULL,
            urgency         TEXT NOT NULL,
            contact_phone   TEXT NOT NULL,
            notes           TEXT NOT NULL DEFAULT '',
            status          TEXT NOT NULL,
            donor_id        TEXT REFERENCES users(id),
            created_at      TEXT NOT NULL,
            accepted_at     TEXT,
            donated_at      TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_requests_status
            ON requests(status, created_at);
        CREATE INDEX IF NOT EXISTS idx_requests_requester
            ON requests(requester_id);
        CREATE INDEX IF NOT EXISTS idx_requests_donor
            ON requests(donor_id);

        CREATE TABLE IF NOT EXISTS inventory (
            blood_group   TEXT PRIMARY KEY,
            units         INTEGER NOT NULL,
            last_updated  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS emergencies (
            id               TEXT PRIMARY KEY,
            requester_id     TEXT NOT NULL REFERENCES users(id),
            requester_name   TEXT NOT NULL,
            requester_phone  TEXT NOT NULL,
            blood_group      TEXT NOT NULL,
            location         TEXT NOT NULL,
            hospital         TEXT NOT NULL,
            contact_phone    TEXT NOT NULL,
            details          TEXT NOT NULL,
            status           TEXT NOT NULL,
            created_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS emergency_responders (
            alert_id      TEXT NOT NULL REFERENCES emergencies(id),
            user_id       TEXT NOT NULL REFERENCES users(id),
            responded_at  TEXT NOT NULL,
            PRIMARY KEY (alert_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS activities (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            kind        TEXT NOT NULL,
            message     TEXT NOT NULL,
            icon        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_activities_created
            ON activities(created_at);

        CREATE TABLE IF NOT EXISTS badges (
            user_id     TEXT NOT NULL REFERENCES users(id),
            badge       TEXT NOT NULL,
            awarded_at  TEXT NOT NULL,
            PRIMARY KEY (user_id, badge)
        );

        CREATE TABLE IF NOT EXISTS camps (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            location    TEXT NOT NULL,
            date        TEXT NOT NULL,
            time        TEXT NOT NULL,
            organizer   TEXT NOT NULL,
            contact     TEXT NOT NULL,
            registered  INTEGER NOT NULL DEFAULT 0,
            capacity    INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS camp_registrations (
            camp_id        TEXT NOT NULL REFERENCES camps(id),
            user_id        TEXT NOT NULL REFERENCES users(id),
            registered_at  TEXT NOT NULL,
            PRIMARY KEY (camp_id, user_id)
        );
        ",
    )?;

    let now = Utc::now();
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO inventory (blood_group, units, last_updated) VALUES (?1, ?2, ?3)",
    )?;
    for (group, units) in INITIAL_INVENTORY {
        stmt.execute(rusqlite::params![group.as_str(), units, now])?;
    }

    info!("Database migrations complete");
    Ok(())
}

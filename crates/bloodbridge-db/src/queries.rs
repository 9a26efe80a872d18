use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use bloodbridge_types::badges::Badge;
use bloodbridge_types::models::{
    Activity, AlertStatus, BloodCamp, BloodRequest, EmergencyAlert, InventoryEntry, RequestStatus,
    User,
};
use bloodbridge_types::{BloodGroup, phone};

use crate::Database;
use crate::models::{CampRegistration, LeaderboardRow, RequestRow};

/// The activity feed keeps this many newest entries.
pub const ACTIVITY_FEED_LIMIT: u32 = 50;

const USER_COLUMNS: &str = "id, full_name, email, phone, password, blood_group, created_at";

const REQUEST_COLUMNS: &str = "r.id, r.requester_id, r.blood_group, r.location, r.quantity, \
     r.urgency, r.contact_phone, r.notes, r.status, r.donor_id, r.created_at, r.accepted_at, \
     r.donated_at";

const ALERT_COLUMNS: &str = "id, requester_id, requester_name, requester_phone, blood_group, \
     location, hospital, contact_phone, details, status, created_at";

const CAMP_COLUMNS: &str = "id, name, location, date, time, organizer, contact, registered, capacity";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &User) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, full_name, email, phone, phone_normalized, password, blood_group, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    user.id.to_string(),
                    user.full_name,
                    user.email.to_lowercase(),
                    user.phone,
                    phone::normalize(&user.phone),
                    user.password_hash,
                    user.blood_group.as_str(),
                    user.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
            optional(conn.query_row(&sql, [id.to_string()], map_user))
        })
    }

    /// Case-insensitive: emails are stored lowercased.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
            optional(conn.query_row(&sql, [email.trim().to_lowercase()], map_user))
        })
    }

    /// Matches on digits only, so `+91-98765-43210` finds `+91 98765 43210`.
    pub fn get_user_by_phone(&self, phone_number: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE phone_normalized = ?1");
            optional(conn.query_row(&sql, [phone::normalize(phone_number)], map_user))
        })
    }

    /// Users whose blood group is one of `groups`.
    pub fn get_users_in_groups(&self, groups: &[BloodGroup]) -> Result<Vec<User>> {
        if groups.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=groups.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users WHERE blood_group IN ({}) ORDER BY created_at",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let labels: Vec<&str> = groups.iter().map(|g| g.as_str()).collect();
            let rows = stmt
                .query_map(rusqlite::params_from_iter(labels), map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn count_users(&self) -> Result<u32> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
        })
    }

    // -- Sessions --

    pub fn create_session(
        &self,
        id: Uuid,
        user_id: Uuid,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), user_id.to_string(), created_at, expires_at],
            )?;
            Ok(())
        })
    }

    /// A session is live when it belongs to `user_id`, was not revoked and
    /// has not expired at `now`.
    pub fn session_is_active(&self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let row = optional(conn.query_row(
                "SELECT user_id, expires_at, revoked_at FROM sessions WHERE id = ?1",
                [id.to_string()],
                |row| {
                    Ok((
                        parsed::<Uuid>(row, 0)?,
                        row.get::<_, DateTime<Utc>>(1)?,
                        row.get::<_, Option<DateTime<Utc>>>(2)?,
                    ))
                },
            ))?;

            Ok(matches!(
                row,
                Some((owner, expires_at, None)) if owner == user_id && expires_at > now
            ))
        })
    }

    /// Returns false when the session was unknown or already revoked.
    pub fn revoke_session(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE sessions SET revoked_at = ?1 WHERE id = ?2 AND revoked_at IS NULL",
                params![now, id.to_string()],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Requests --

    pub fn insert_request(&self, req: &BloodRequest) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO requests (id, requester_id, blood_group, location, quantity, urgency,
                                       contact_phone, notes, status, donor_id, created_at,
                                       accepted_at, donated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    req.id.to_string(),
                    req.requester_id.to_string(),
                    req.blood_group.as_str(),
                    req.location,
                    req.quantity,
                    req.urgency.as_str(),
                    req.contact_phone,
                    req.notes,
                    req.status.as_str(),
                    req.donor_id.map(|id| id.to_string()),
                    req.created_at,
                    req.accepted_at,
                    req.donated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_request(&self, id: Uuid) -> Result<Option<BloodRequest>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {REQUEST_COLUMNS} FROM requests r WHERE r.id = ?1");
            optional(conn.query_row(&sql, [id.to_string()], |row| map_request(row, 0)))
        })
    }

    pub fn get_request_row(&self, id: Uuid) -> Result<Option<RequestRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REQUEST_COLUMNS}, u.full_name, u.phone
                 FROM requests r
                 LEFT JOIN users u ON u.id = r.requester_id
                 WHERE r.id = ?1"
            );
            optional(conn.query_row(&sql, [id.to_string()], map_request_row))
        })
    }

    /// Every request with its requester, newest first.
    pub fn get_all_requests(&self) -> Result<Vec<RequestRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REQUEST_COLUMNS}, u.full_name, u.phone
                 FROM requests r
                 LEFT JOIN users u ON u.id = r.requester_id
                 ORDER BY r.created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_request_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Pending requests with their requester, oldest first.
    pub fn get_pending_requests(&self) -> Result<Vec<RequestRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REQUEST_COLUMNS}, u.full_name, u.phone
                 FROM requests r
                 LEFT JOIN users u ON u.id = r.requester_id
                 WHERE r.status = 'pending'
                 ORDER BY r.created_at"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_request_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_requests_by_requester(&self, requester_id: Uuid) -> Result<Vec<BloodRequest>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REQUEST_COLUMNS} FROM requests r
                 WHERE r.requester_id = ?1 ORDER BY r.created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([requester_id.to_string()], |row| map_request(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_requests_by_donor(&self, donor_id: Uuid) -> Result<Vec<BloodRequest>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REQUEST_COLUMNS} FROM requests r
                 WHERE r.donor_id = ?1 ORDER BY r.created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([donor_id.to_string()], |row| map_request(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Persist a lifecycle transition already applied to `req` in memory.
    ///
    /// The update only lands if the stored status is still `from`. Returns
    /// false when another writer moved the request first.
    pub fn apply_transition(&self, req: &BloodRequest, from: RequestStatus) -> Result<bool> {
        self.with_conn(|conn| update_transition(conn, req, from))
    }

    /// Mark an accepted request donated and credit its units to the inventory,
    /// atomically. Returns false if the request was no longer accepted.
    pub fn record_donation(&self, req: &BloodRequest) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if !update_transition(&tx, req, RequestStatus::Accepted)? {
                return Ok(false);
            }
            tx.execute(
                "UPDATE inventory SET units = units + ?1, last_updated = ?2 WHERE blood_group = ?3",
                params![req.quantity, req.donated_at.unwrap_or_else(Utc::now), req.blood_group.as_str()],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn count_donations_by(&self, donor_id: Uuid) -> Result<u32> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM requests WHERE donor_id = ?1 AND status = 'donated'",
                [donor_id.to_string()],
                |row| row.get(0),
            )?)
        })
    }

    pub fn count_requests_by(&self, requester_id: Uuid) -> Result<u32> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM requests WHERE requester_id = ?1",
                [requester_id.to_string()],
                |row| row.get(0),
            )?)
        })
    }

    pub fn count_requests_with_status(&self, status: RequestStatus) -> Result<u32> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM requests WHERE status = ?1",
                [status.as_str()],
                |row| row.get(0),
            )?)
        })
    }

    pub fn count_donations_since(&self, since: DateTime<Utc>) -> Result<u32> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM requests WHERE status = 'donated' AND donated_at >= ?1",
                params![since],
                |row| row.get(0),
            )?)
        })
    }

    /// Donors ranked by confirmed donations, most first.
    pub fn get_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.full_name, u.blood_group, COUNT(r.id) AS donations,
                        (SELECT COUNT(*) FROM badges b WHERE b.user_id = u.id)
                 FROM requests r
                 JOIN users u ON u.id = r.donor_id
                 WHERE r.status = 'donated'
                 GROUP BY u.id
                 ORDER BY donations DESC, u.full_name
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok(LeaderboardRow {
                        user_id: parsed(row, 0)?,
                        full_name: row.get(1)?,
                        blood_group: parsed(row, 2)?,
                        donations: row.get(3)?,
                        badges: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Inventory --

    /// Stock per group in display order.
    pub fn get_inventory(&self) -> Result<Vec<InventoryEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT blood_group, units, last_updated FROM inventory")?;
            let mut rows = stmt
                .query_map([], |row| {
                    Ok(InventoryEntry {
                        blood_group: parsed(row, 0)?,
                        units: row.get(1)?,
                        last_updated: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.sort_by_key(|e| e.blood_group);
            Ok(rows)
        })
    }

    // -- Emergencies --

    pub fn insert_alert(&self, alert: &EmergencyAlert) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO emergencies (id, requester_id, requester_name, requester_phone,
                                          blood_group, location, hospital, contact_phone,
                                          details, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    alert.id.to_string(),
                    alert.requester_id.to_string(),
                    alert.requester_name,
                    alert.requester_phone,
                    alert.blood_group.as_str(),
                    alert.location,
                    alert.hospital,
                    alert.contact_phone,
                    alert.details,
                    alert.status.as_str(),
                    alert.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_alert(&self, id: Uuid) -> Result<Option<EmergencyAlert>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {ALERT_COLUMNS} FROM emergencies WHERE id = ?1");
            let Some(mut alert) = optional(conn.query_row(&sql, [id.to_string()], map_alert))?
            else {
                return Ok(None);
            };
            alert.responders = query_responders(conn, alert.id)?;
            Ok(Some(alert))
        })
    }

    /// Active alerts, newest first, with their responders.
    pub fn get_active_alerts(&self) -> Result<Vec<EmergencyAlert>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {ALERT_COLUMNS} FROM emergencies WHERE status = 'active' ORDER BY created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut alerts = stmt
                .query_map([], map_alert)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            for alert in &mut alerts {
                alert.responders = query_responders(conn, alert.id)?;
            }
            Ok(alerts)
        })
    }

    /// Returns false if the user had already responded.
    pub fn add_responder(&self, alert_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO emergency_responders (alert_id, user_id, responded_at)
                 VALUES (?1, ?2, ?3)",
                params![alert_id.to_string(), user_id.to_string(), now],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn count_alerts_with_status(&self, status: AlertStatus) -> Result<u32> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM emergencies WHERE status = ?1",
                [status.as_str()],
                |row| row.get(0),
            )?)
        })
    }

    // -- Activity feed --

    /// Append to the feed, dropping entries beyond the newest
    /// [`ACTIVITY_FEED_LIMIT`].
    pub fn add_activity(&self, activity: &Activity) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO activities (id, user_id, kind, message, icon, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    activity.id.to_string(),
                    activity.user_id.to_string(),
                    activity.kind,
                    activity.message,
                    activity.icon,
                    activity.created_at,
                ],
            )?;
            conn.execute(
                "DELETE FROM activities WHERE id NOT IN
                    (SELECT id FROM activities ORDER BY created_at DESC LIMIT ?1)",
                [ACTIVITY_FEED_LIMIT],
            )?;
            Ok(())
        })
    }

    pub fn get_recent_activities(&self, limit: u32) -> Result<Vec<Activity>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, message, icon, created_at
                 FROM activities ORDER BY created_at DESC LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok(Activity {
                        id: parsed(row, 0)?,
                        user_id: parsed(row, 1)?,
                        kind: row.get(2)?,
                        message: row.get(3)?,
                        icon: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Badges --

    /// Returns true only the first time a badge is awarded to a user.
    pub fn award_badge(&self, user_id: Uuid, badge: Badge, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO badges (user_id, badge, awarded_at) VALUES (?1, ?2, ?3)",
                params![user_id.to_string(), badge.key(), now],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn get_badges(&self, user_id: Uuid) -> Result<Vec<Badge>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT badge FROM badges WHERE user_id = ?1 ORDER BY awarded_at")?;
            let rows = stmt
                .query_map([user_id.to_string()], |row| parsed(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Camps --

    pub fn insert_camp(&self, camp: &BloodCamp) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO camps (id, name, location, date, time, organizer, contact, registered, capacity)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    camp.id.to_string(),
                    camp.name,
                    camp.location,
                    camp.date,
                    camp.time,
                    camp.organizer,
                    camp.contact,
                    camp.registered,
                    camp.capacity,
                ],
            )?;
            Ok(())
        })
    }

    /// Camps ordered by date.
    pub fn get_camps(&self) -> Result<Vec<BloodCamp>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {CAMP_COLUMNS} FROM camps ORDER BY date, name");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_camp)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_camp(&self, id: Uuid) -> Result<Option<BloodCamp>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {CAMP_COLUMNS} FROM camps WHERE id = ?1");
            optional(conn.query_row(&sql, [id.to_string()], map_camp))
        })
    }

    pub fn get_registered_camp_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT camp_id FROM camp_registrations WHERE user_id = ?1")?;
            let rows = stmt
                .query_map([user_id.to_string()], |row| parsed(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Register `user_id` for a camp if it has room. The capacity check, the
    /// registration row and the counter bump share one transaction.
    pub fn register_for_camp(
        &self,
        camp_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CampRegistration> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let camp_key = camp_id.to_string();

            let Some((registered, capacity)) = optional(tx.query_row(
                "SELECT registered, capacity FROM camps WHERE id = ?1",
                [&camp_key],
                |row| Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?)),
            ))?
            else {
                return Ok(CampRegistration::NotFound);
            };

            let already: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM camp_registrations WHERE camp_id = ?1 AND user_id = ?2)",
                params![camp_key, user_id.to_string()],
                |row| row.get(0),
            )?;
            if already {
                return Ok(CampRegistration::AlreadyRegistered);
            }
            if registered >= capacity {
                return Ok(CampRegistration::Full);
            }

            tx.execute(
                "INSERT INTO camp_registrations (camp_id, user_id, registered_at) VALUES (?1, ?2, ?3)",
                params![camp_key, user_id.to_string(), now],
            )?;
            tx.execute(
                "UPDATE camps SET registered = registered + 1 WHERE id = ?1",
                [&camp_key],
            )?;
            tx.commit()?;
            Ok(CampRegistration::Registered)
        })
    }
}

fn update_transition(conn: &Connection, req: &BloodRequest, from: RequestStatus) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE requests
         SET status = ?1, donor_id = ?2, accepted_at = ?3, donated_at = ?4
         WHERE id = ?5 AND status = ?6",
        params![
            req.status.as_str(),
            req.donor_id.map(|id| id.to_string()),
            req.accepted_at,
            req.donated_at,
            req.id.to_string(),
            from.as_str(),
        ],
    )?;
    Ok(changed == 1)
}

fn query_responders(conn: &Connection, alert_id: Uuid) -> Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM emergency_responders WHERE alert_id = ?1 ORDER BY responded_at",
    )?;
    let rows = stmt
        .query_map([alert_id.to_string()], |row| parsed(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parsed(row, 0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        password_hash: row.get(4)?,
        blood_group: parsed(row, 5)?,
        created_at: row.get(6)?,
    })
}

/// Maps the 13 [`REQUEST_COLUMNS`] starting at `offset`.
fn map_request(row: &Row<'_>, offset: usize) -> rusqlite::Result<BloodRequest> {
    Ok(BloodRequest {
        id: parsed(row, offset)?,
        requester_id: parsed(row, offset + 1)?,
        blood_group: parsed(row, offset + 2)?,
        location: row.get(offset + 3)?,
        quantity: row.get(offset + 4)?,
        urgency: parsed(row, offset + 5)?,
        contact_phone: row.get(offset + 6)?,
        notes: row.get(offset + 7)?,
        status: parsed(row, offset + 8)?,
        donor_id: parsed_opt(row, offset + 9)?,
        created_at: row.get(offset + 10)?,
        accepted_at: row.get(offset + 11)?,
        donated_at: row.get(offset + 12)?,
    })
}

fn map_request_row(row: &Row<'_>) -> rusqlite::Result<RequestRow> {
    Ok(RequestRow {
        request: map_request(row, 0)?,
        requester_name: row.get(13)?,
        requester_phone: row.get(14)?,
    })
}

fn map_alert(row: &Row<'_>) -> rusqlite::Result<EmergencyAlert> {
    Ok(EmergencyAlert {
        id: parsed(row, 0)?,
        requester_id: parsed(row, 1)?,
        requester_name: row.get(2)?,
        requester_phone: row.get(3)?,
        blood_group: parsed(row, 4)?,
        location: row.get(5)?,
        hospital: row.get(6)?,
        contact_phone: row.get(7)?,
        details: row.get(8)?,
        status: parsed(row, 9)?,
        created_at: row.get(10)?,
        responders: Vec::new(),
    })
}

fn map_camp(row: &Row<'_>) -> rusqlite::Result<BloodCamp> {
    Ok(BloodCamp {
        id: parsed(row, 0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        date: row.get(3)?,
        time: row.get(4)?,
        organizer: row.get(5)?,
        contact: row.get(6)?,
        registered: row.get(7)?,
        capacity: row.get(8)?,
    })
}

/// Read a TEXT column and parse it with `FromStr` (ids, enums).
fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parsed_opt<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn optional<T>(res: rusqlite::Result<T>) -> Result<Option<T>> {
    match res {
        Ok(val) => Ok(Some(val)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloodbridge_types::models::Urgency;
    use chrono::Duration;

    fn user(db: &Database, name: &str, email: &str, phone_number: &str, group: BloodGroup) -> User {
        let user = User {
            id: Uuid::new_v4(),
            full_name: name.into(),
            email: email.into(),
            password_hash: "hash".into(),
            phone: phone_number.into(),
            blood_group: group,
            created_at: Utc::now(),
        };
        db.create_user(&user).unwrap();
        user
    }

    fn request(db: &Database, requester: Uuid, group: BloodGroup, quantity: u32) -> BloodRequest {
        let req = BloodRequest {
            id: Uuid::new_v4(),
            requester_id: requester,
            blood_group: group,
            location: "City Hospital".into(),
            quantity,
            urgency: Urgency::High,
            contact_phone: "+919876543210".into(),
            notes: String::new(),
            status: RequestStatus::Pending,
            donor_id: None,
            created_at: Utc::now(),
            accepted_at: None,
            donated_at: None,
        };
        db.insert_request(&req).unwrap();
        req
    }

    #[test]
    fn email_is_unique_case_insensitively() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "John", "john@demo.com", "+91-98765-43210", BloodGroup::OPos);

        let dup = User {
            id: Uuid::new_v4(),
            full_name: "Other John".into(),
            email: "JOHN@demo.com".into(),
            password_hash: "hash".into(),
            phone: "+91-98765-00000".into(),
            blood_group: BloodGroup::APos,
            created_at: Utc::now(),
        };
        let err = db.create_user(&dup).unwrap_err();
        assert!(crate::is_constraint_violation(&err));
        assert_eq!(db.count_users().unwrap(), 1);

        let found = db.get_user_by_email(" John@Demo.com ").unwrap().unwrap();
        assert_eq!(found.full_name, "John");
    }

    #[test]
    fn phone_lookup_ignores_formatting() {
        let db = Database::open_in_memory().unwrap();
        let john = user(&db, "John", "john@demo.com", "+91-98765-43210", BloodGroup::OPos);
        let found = db.get_user_by_phone("+91 98765 43210").unwrap().unwrap();
        assert_eq!(found.id, john.id);
        assert!(db.get_user_by_phone("0000000000").unwrap().is_none());
    }

    #[test]
    fn users_by_group() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "A", "a@x.com", "1111111111", BloodGroup::OPos);
        user(&db, "B", "b@x.com", "2222222222", BloodGroup::ONeg);
        user(&db, "C", "c@x.com", "3333333333", BloodGroup::AbPos);

        let donors = db.get_users_in_groups(&BloodGroup::APos.compatible_donors()).unwrap();
        let names: Vec<_> = donors.iter().map(|u| u.full_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(db.get_users_in_groups(&[]).unwrap().is_empty());
    }

    #[test]
    fn sessions_expire_and_revoke() {
        let db = Database::open_in_memory().unwrap();
        let john = user(&db, "John", "john@demo.com", "9876543210", BloodGroup::OPos);
        let now = Utc::now();
        let sid = Uuid::new_v4();
        db.create_session(sid, john.id, now, now + Duration::days(1)).unwrap();

        assert!(db.session_is_active(sid, john.id, now).unwrap());
        assert!(!db.session_is_active(sid, Uuid::new_v4(), now).unwrap());
        assert!(!db.session_is_active(sid, john.id, now + Duration::days(2)).unwrap());

        assert!(db.revoke_session(sid, now).unwrap());
        assert!(!db.revoke_session(sid, now).unwrap());
        assert!(!db.session_is_active(sid, john.id, now).unwrap());
    }

    #[test]
    fn guarded_transition_rejects_stale_writer() {
        let db = Database::open_in_memory().unwrap();
        let requester = user(&db, "Sarah", "sarah@demo.com", "1111111111", BloodGroup::APos);
        let d1 = user(&db, "John", "john@demo.com", "2222222222", BloodGroup::OPos);
        let d2 = user(&db, "David", "david@demo.com", "3333333333", BloodGroup::ONeg);
        let req = request(&db, requester.id, BloodGroup::APos, 2);

        // Both donors load the pending request before either writes.
        let mut first = db.get_request(req.id).unwrap().unwrap();
        let mut second = db.get_request(req.id).unwrap().unwrap();
        first.respond(d1.id, Utc::now()).unwrap();
        second.respond(d2.id, Utc::now()).unwrap();

        assert!(db.apply_transition(&first, RequestStatus::Pending).unwrap());
        assert!(!db.apply_transition(&second, RequestStatus::Pending).unwrap());

        let stored = db.get_request(req.id).unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Accepted);
        assert_eq!(stored.donor_id, Some(d1.id));
    }

    #[test]
    fn donation_credits_inventory_once() {
        let db = Database::open_in_memory().unwrap();
        let requester = user(&db, "Sarah", "sarah@demo.com", "1111111111", BloodGroup::APos);
        let donor = user(&db, "John", "john@demo.com", "2222222222", BloodGroup::OPos);
        let mut req = request(&db, requester.id, BloodGroup::APos, 3);

        let before = units(&db, BloodGroup::APos);

        req.respond(donor.id, Utc::now()).unwrap();
        assert!(db.apply_transition(&req, RequestStatus::Pending).unwrap());
        req.confirm(requester.id, Utc::now()).unwrap();
        assert!(db.record_donation(&req).unwrap());
        assert!(!db.record_donation(&req).unwrap());

        assert_eq!(units(&db, BloodGroup::APos), before + 3);
        assert_eq!(db.count_donations_by(donor.id).unwrap(), 1);
        assert_eq!(db.count_requests_by(requester.id).unwrap(), 1);
        assert_eq!(db.count_donations_since(Utc::now() - Duration::hours(1)).unwrap(), 1);
        assert_eq!(db.get_requests_by_donor(donor.id).unwrap().len(), 1);
    }

    fn units(db: &Database, group: BloodGroup) -> i64 {
        db.get_inventory()
            .unwrap()
            .into_iter()
            .find(|e| e.blood_group == group)
            .map(|e| e.units)
            .unwrap()
    }

    #[test]
    fn inventory_seeded_in_display_order() {
        let db = Database::open_in_memory().unwrap();
        let inventory = db.get_inventory().unwrap();
        let groups: Vec<_> = inventory.iter().map(|e| e.blood_group).collect();
        assert_eq!(groups, BloodGroup::ALL.to_vec());
        assert_eq!(inventory[0].units, 25);
        assert_eq!(inventory[7].units, 10);
    }

    #[test]
    fn pending_rows_carry_requester() {
        let db = Database::open_in_memory().unwrap();
        let sarah = user(&db, "Sarah", "sarah@demo.com", "1111111111", BloodGroup::APos);
        request(&db, sarah.id, BloodGroup::APos, 1);

        let rows = db.get_pending_requests().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].requester_name.as_deref(), Some("Sarah"));
        assert_eq!(db.count_requests_with_status(RequestStatus::Pending).unwrap(), 1);
    }

    #[test]
    fn activity_feed_is_capped() {
        let db = Database::open_in_memory().unwrap();
        let uid = Uuid::new_v4();
        let start = Utc::now();
        for i in 0..(ACTIVITY_FEED_LIMIT + 5) {
            db.add_activity(&Activity {
                id: Uuid::new_v4(),
                user_id: uid,
                kind: "request".into(),
                message: format!("event {i}"),
                icon: "🩸".into(),
                created_at: start + Duration::seconds(i as i64),
            })
            .unwrap();
        }

        let all = db.get_recent_activities(1000).unwrap();
        assert_eq!(all.len(), ACTIVITY_FEED_LIMIT as usize);
        assert_eq!(all[0].message, format!("event {}", ACTIVITY_FEED_LIMIT + 4));
    }

    #[test]
    fn badges_award_once_and_feed_leaderboard() {
        let db = Database::open_in_memory().unwrap();
        let requester = user(&db, "Sarah", "sarah@demo.com", "1111111111", BloodGroup::APos);
        let donor = user(&db, "John", "john@demo.com", "2222222222", BloodGroup::OPos);
        let now = Utc::now();

        assert!(db.award_badge(donor.id, Badge::FirstBlood, now).unwrap());
        assert!(!db.award_badge(donor.id, Badge::FirstBlood, now).unwrap());
        assert_eq!(db.get_badges(donor.id).unwrap(), vec![Badge::FirstBlood]);

        let mut req = request(&db, requester.id, BloodGroup::APos, 1);
        req.respond(donor.id, now).unwrap();
        db.apply_transition(&req, RequestStatus::Pending).unwrap();
        req.confirm(requester.id, now).unwrap();
        db.record_donation(&req).unwrap();

        let board = db.get_leaderboard(20).unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].user_id, donor.id);
        assert_eq!(board[0].donations, 1);
        assert_eq!(board[0].badges, 1);
    }

    #[test]
    fn emergency_responders() {
        let db = Database::open_in_memory().unwrap();
        let john = user(&db, "John", "john@demo.com", "2222222222", BloodGroup::OPos);
        let alert = EmergencyAlert {
            id: Uuid::new_v4(),
            requester_id: john.id,
            requester_name: john.full_name.clone(),
            requester_phone: john.phone.clone(),
            blood_group: BloodGroup::ONeg,
            location: "Downtown".into(),
            hospital: "City General".into(),
            contact_phone: john.phone.clone(),
            details: "Accident".into(),
            status: AlertStatus::Active,
            created_at: Utc::now(),
            responders: vec![],
        };
        db.insert_alert(&alert).unwrap();

        let responder = Uuid::new_v4();
        assert!(db.add_responder(alert.id, responder, Utc::now()).is_err());

        let david = user(&db, "David", "david@demo.com", "3333333333", BloodGroup::ONeg);
        assert!(db.add_responder(alert.id, david.id, Utc::now()).unwrap());
        assert!(!db.add_responder(alert.id, david.id, Utc::now()).unwrap());

        let stored = db.get_alert(alert.id).unwrap().unwrap();
        assert_eq!(stored.responders, vec![david.id]);
        assert_eq!(db.get_active_alerts().unwrap().len(), 1);
        assert_eq!(db.count_alerts_with_status(AlertStatus::Active).unwrap(), 1);
    }

    #[test]
    fn camp_registration_outcomes() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "A", "a@x.com", "1111111111", BloodGroup::OPos);
        let b = user(&db, "B", "b@x.com", "2222222222", BloodGroup::APos);
        let camp = BloodCamp {
            id: Uuid::new_v4(),
            name: "City Hospital Blood Drive".into(),
            location: "Main Street".into(),
            date: Utc::now().date_naive(),
            time: "09:00 AM - 05:00 PM".into(),
            organizer: "City Hospital".into(),
            contact: "+1-555-0100".into(),
            registered: 0,
            capacity: 1,
        };
        db.insert_camp(&camp).unwrap();
        let now = Utc::now();

        assert_eq!(db.register_for_camp(camp.id, a.id, now).unwrap(), CampRegistration::Registered);
        assert_eq!(
            db.register_for_camp(camp.id, a.id, now).unwrap(),
            CampRegistration::AlreadyRegistered
        );
        assert_eq!(db.register_for_camp(camp.id, b.id, now).unwrap(), CampRegistration::Full);
        assert_eq!(
            db.register_for_camp(Uuid::new_v4(), b.id, now).unwrap(),
            CampRegistration::NotFound
        );

        assert_eq!(db.get_camp(camp.id).unwrap().unwrap().registered, 1);
        assert_eq!(db.get_registered_camp_ids(a.id).unwrap(), vec![camp.id]);
        assert_eq!(db.get_camps().unwrap().len(), 1);
    }

    #[test]
    fn file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bloodbridge.db");
        {
            let db = Database::open(&path).unwrap();
            user(&db, "John", "john@demo.com", "9876543210", BloodGroup::OPos);
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.count_users().unwrap(), 1);
        assert_eq!(db.get_inventory().unwrap().len(), 8);
    }
}

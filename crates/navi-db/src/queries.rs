use crate::Database;
use crate::models::{
    MarkerListingRow, MarkerPatch, MarkerRow, NewMarker, ShareListingRow, ShareRow, UserRow,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};

const MARKER_COLUMNS: &str =
    "m.id, m.owner_id, m.title, m.note, m.lat, m.lng, m.visible, m.created_at, m.updated_at";

impl Database {
    // -- Users --

    /// Insert a user. A taken username surfaces as a unique violation,
    /// see [`crate::is_unique_violation`].
    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<UserRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![username, password_hash, now],
            )?;
            let id = conn.last_insert_rowid();
            query_user(conn, "id = ?1", id)?
                .ok_or_else(|| anyhow::anyhow!("User {} vanished after insert", id))
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| find_user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    // -- Markers --

    pub fn insert_marker(&self, new: &NewMarker<'_>) -> Result<MarkerRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO markers (owner_id, title, note, lat, lng, visible, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                rusqlite::params![
                    new.owner_id,
                    new.title,
                    new.note,
                    new.lat,
                    new.lng,
                    new.visible,
                    new.now
                ],
            )?;
            let id = conn.last_insert_rowid();
            find_marker(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("Marker {} vanished after insert", id))
        })
    }

    pub fn get_marker(&self, id: i64) -> Result<Option<MarkerRow>> {
        self.with_conn(|conn| find_marker(conn, id))
    }

    pub fn patch_marker(
        &self,
        id: i64,
        patch: &MarkerPatch<'_>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<MarkerRow>> {
        self.with_conn(|conn| patch_marker(conn, id, patch, updated_at))
    }

    /// Delete a marker. Its shares go with it through the foreign key cascade.
    /// Returns false when no such marker existed.
    pub fn delete_marker(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| remove_marker(conn, id))
    }

    pub fn list_owned_markers(&self, owner_id: i64) -> Result<Vec<MarkerListingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MARKER_COLUMNS}, u.username
                 FROM markers m
                 JOIN users u ON m.owner_id = u.id
                 WHERE m.owner_id = ?1
                 ORDER BY m.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id], |row| {
                    Ok(MarkerListingRow {
                        marker: marker_from_row(row)?,
                        owner_username: row.get(9)?,
                        share_can_edit: None,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Markers shared to `user_id`, with the owner's username and the share's
    /// edit flag joined in (single query, no N+1).
    pub fn list_shared_markers(&self, user_id: i64) -> Result<Vec<MarkerListingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MARKER_COLUMNS}, u.username, s.can_edit
                 FROM marker_shares s
                 JOIN markers m ON s.marker_id = m.id
                 JOIN users u ON m.owner_id = u.id
                 WHERE s.user_id = ?1
                 ORDER BY m.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(MarkerListingRow {
                        marker: marker_from_row(row)?,
                        owner_username: row.get(9)?,
                        share_can_edit: Some(row.get(10)?),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Shares --

    pub fn get_share(&self, marker_id: i64, user_id: i64) -> Result<Option<ShareRow>> {
        self.with_conn(|conn| find_share(conn, marker_id, user_id))
    }

    pub fn upsert_share(
        &self,
        marker_id: i64,
        user_id: i64,
        can_edit: bool,
        now: DateTime<Utc>,
    ) -> Result<ShareRow> {
        self.with_conn(|conn| upsert_share(conn, marker_id, user_id, can_edit, now))
    }

    pub fn list_shares(&self, marker_id: i64) -> Result<Vec<ShareListingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.user_id, u.username, s.can_edit
                 FROM marker_shares s
                 JOIN users u ON s.user_id = u.id
                 WHERE s.marker_id = ?1
                 ORDER BY s.id",
            )?;
            let rows = stmt
                .query_map([marker_id], |row| {
                    Ok(ShareListingRow {
                        share_id: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row.get(2)?,
                        can_edit: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when there was no share to remove.
    pub fn delete_share(&self, marker_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| remove_share(conn, marker_id, user_id))
    }
}

// Connection-level queries. The `Database` methods above wrap these in the
// connection lock; callers that need several of them to see one consistent
// state run them inside `Database::transaction`.

pub fn find_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    query_user(conn, "username = ?1", username)
}

pub fn find_marker(conn: &Connection, id: i64) -> Result<Option<MarkerRow>> {
    let sql = format!("SELECT {MARKER_COLUMNS} FROM markers m WHERE m.id = ?1");
    conn.query_row(&sql, [id], marker_from_row).optional()
}

/// Write the columns present in `patch` plus `updated_at`, and return the
/// stored row. `None` when the marker does not exist.
pub fn patch_marker(
    conn: &Connection,
    id: i64,
    patch: &MarkerPatch<'_>,
    updated_at: DateTime<Utc>,
) -> Result<Option<MarkerRow>> {
    conn.query_row(
        "UPDATE markers
         SET title = COALESCE(?2, title),
             note = COALESCE(?3, note),
             lat = COALESCE(?4, lat),
             lng = COALESCE(?5, lng),
             visible = COALESCE(?6, visible),
             updated_at = ?7
         WHERE id = ?1
         RETURNING id, owner_id, title, note, lat, lng, visible, created_at, updated_at",
        rusqlite::params![
            id,
            patch.title,
            patch.note,
            patch.lat,
            patch.lng,
            patch.visible,
            updated_at
        ],
        marker_from_row,
    )
    .optional()
}

pub fn remove_marker(conn: &Connection, id: i64) -> Result<bool> {
    let affected = conn.execute("DELETE FROM markers WHERE id = ?1", [id])?;
    Ok(affected > 0)
}

pub fn find_share(conn: &Connection, marker_id: i64, user_id: i64) -> Result<Option<ShareRow>> {
    conn.query_row(
        "SELECT id, marker_id, user_id, can_edit, created_at
         FROM marker_shares WHERE marker_id = ?1 AND user_id = ?2",
        [marker_id, user_id],
        share_from_row,
    )
    .optional()
}

/// Create the (marker, user) share, or overwrite `can_edit` on the one
/// that already exists. `created_at` of an existing share is kept.
pub fn upsert_share(
    conn: &Connection,
    marker_id: i64,
    user_id: i64,
    can_edit: bool,
    now: DateTime<Utc>,
) -> Result<ShareRow> {
    let row = conn.query_row(
        "INSERT INTO marker_shares (marker_id, user_id, can_edit, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(marker_id, user_id) DO UPDATE SET can_edit = excluded.can_edit
         RETURNING id, marker_id, user_id, can_edit, created_at",
        rusqlite::params![marker_id, user_id, can_edit, now],
        share_from_row,
    )?;
    Ok(row)
}

pub fn remove_share(conn: &Connection, marker_id: i64, user_id: i64) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM marker_shares WHERE marker_id = ?1 AND user_id = ?2",
        [marker_id, user_id],
    )?;
    Ok(affected > 0)
}

fn query_user<P: rusqlite::ToSql>(
    conn: &Connection,
    predicate: &str,
    value: P,
) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, password_hash, role, created_at FROM users WHERE {predicate}"
    );
    let mut stmt = conn.prepare(&sql)?;

    stmt.query_row([value], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            role: row.get(3)?,
            created_at: row.get(4)?,
        })
    })
    .optional()
}

/// Reads the first nine columns laid out as in `MARKER_COLUMNS`.
fn marker_from_row(row: &Row<'_>) -> rusqlite::Result<MarkerRow> {
    Ok(MarkerRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        note: row.get(3)?,
        lat: row.get(4)?,
        lng: row.get(5)?,
        visible: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn share_from_row(row: &Row<'_>) -> rusqlite::Result<ShareRow> {
    Ok(ShareRow {
        id: row.get(0)?,
        marker_id: row.get(1)?,
        user_id: row.get(2)?,
        can_edit: row.get(3)?,
        created_at: row.get(4)?,
    })
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

//! Database row types. These map directly to SQLite rows and stay
//! independent of the wire types in navi-types.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRow {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub note: String,
    pub lat: f64,
    pub lng: f64,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ShareRow {
    pub id: i64,
    pub marker_id: i64,
    pub user_id: i64,
    pub can_edit: bool,
    pub created_at: DateTime<Utc>,
}

/// A marker joined with its owner's username. `share_can_edit` is set when
/// the row was reached through a share rather than ownership.
#[derive(Debug, Clone)]
pub struct MarkerListingRow {
    pub marker: MarkerRow,
    pub owner_username: String,
    pub share_can_edit: Option<bool>,
}

/// A share joined with the grantee's username.
#[derive(Debug, Clone)]
pub struct ShareListingRow {
    pub share_id: i64,
    pub user_id: i64,
    pub username: String,
    pub can_edit: bool,
}

pub struct NewMarker<'a> {
    pub owner_id: i64,
    pub title: &'a str,
    pub note: &'a str,
    pub lat: f64,
    pub lng: f64,
    pub visible: bool,
    pub now: DateTime<Utc>,
}

/// Columns to change on a marker. `None` leaves the stored value alone.
#[derive(Debug, Default)]
pub struct MarkerPatch<'a> {
    pub title: Option<&'a str>,
    pub note: Option<&'a str>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub visible: Option<bool>,
}

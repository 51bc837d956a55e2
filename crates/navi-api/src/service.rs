//! Marker operations. Everything here is synchronous and talks to the
//! database directly; handlers call in through `run_blocking`.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use navi_db::models::{MarkerListingRow, MarkerPatch, MarkerRow, NewMarker};
use navi_db::{Database, queries};
use navi_types::api::{
    CreateMarkerRequest, MarkerResponse, ShareEntry, ShareMarkerRequest, ShareResponse,
    UpdateMarkerRequest,
};

use crate::access::{self, Action, Capabilities};
use crate::error::{ApiError, ensure_valid};

/// Owned and shared markers, newest change first.
pub fn list_markers(db: &Database, user_id: i64) -> Result<Vec<MarkerResponse>, ApiError> {
    let owned = db.list_owned_markers(user_id)?;
    let shared = db.list_shared_markers(user_id)?;

    let mut markers: Vec<MarkerResponse> = owned
        .into_iter()
        .chain(shared.into_iter().filter(|row| row.marker.owner_id != user_id))
        .map(|row| {
            let caps = listing_capabilities(&row);
            annotate(row.marker, row.owner_username, caps)
        })
        .collect();

    // Stable: equal timestamps keep owned-then-shared, id ascending.
    markers.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(markers)
}

pub fn create_marker(
    db: &Database,
    user_id: i64,
    req: CreateMarkerRequest,
) -> Result<MarkerResponse, ApiError> {
    ensure_valid(&req)?;

    let owner = db
        .get_user_by_id(user_id)?
        .ok_or_else(|| ApiError::unauthenticated("user no longer exists"))?;

    let marker = db.insert_marker(&NewMarker {
        owner_id: user_id,
        title: &req.title,
        note: req.note.as_deref().unwrap_or(""),
        lat: req.lat,
        lng: req.lng,
        visible: req.visible.unwrap_or(true),
        now: Utc::now(),
    })?;

    info!(marker_id = marker.id, owner_id = user_id, "Marker created");
    Ok(annotate(marker, owner.username, Capabilities::OWNER))
}

/// Apply the fields present in `req`. `updated_at` moves forward even when
/// nothing else changed. The access check and the write share one
/// transaction, so concurrent partial updates never undo each other.
pub fn update_marker(
    db: &Database,
    user_id: i64,
    marker_id: i64,
    req: UpdateMarkerRequest,
) -> Result<MarkerResponse, ApiError> {
    ensure_valid(&req)?;

    let patch = MarkerPatch {
        title: req.title.as_deref(),
        note: req.note.as_deref(),
        lat: req.lat,
        lng: req.lng,
        visible: req.visible,
    };

    let (marker, caps) = db.transaction(|conn| {
        let (current, caps) = access::authorize(conn, user_id, marker_id, Action::Edit)?;
        let updated_at = next_updated_at(current.updated_at, Utc::now());
        let marker = queries::patch_marker(conn, marker_id, &patch, updated_at)?
            .ok_or_else(ApiError::marker_not_found)?;
        Ok::<_, ApiError>((marker, caps))
    })?;

    let owner_username = owner_username(db, &marker)?;
    Ok(annotate(marker, owner_username, caps))
}

pub fn delete_marker(db: &Database, user_id: i64, marker_id: i64) -> Result<(), ApiError> {
    db.transaction(|conn| {
        access::authorize(conn, user_id, marker_id, Action::Delete)?;
        if !queries::remove_marker(conn, marker_id)? {
            return Err(ApiError::marker_not_found());
        }
        Ok::<_, ApiError>(())
    })?;

    info!(marker_id, owner_id = user_id, "Marker deleted");
    Ok(())
}

/// Grant (or re-grant) `req.username` access to the marker. Re-sharing
/// overwrites `can_edit` on the existing share.
pub fn share_marker(
    db: &Database,
    owner_id: i64,
    marker_id: i64,
    req: ShareMarkerRequest,
) -> Result<ShareResponse, ApiError> {
    ensure_valid(&req)?;

    let (grantee, share) = db.transaction(|conn| {
        access::authorize(conn, owner_id, marker_id, Action::ManageShares)?;

        let grantee = queries::find_user_by_username(conn, &req.username)?
            .ok_or_else(ApiError::user_not_found)?;

        if grantee.id == owner_id {
            return Err(ApiError::bad_request("cannot share a marker with yourself"));
        }

        let share = queries::upsert_share(conn, marker_id, grantee.id, req.can_edit, Utc::now())?;
        Ok::<_, ApiError>((grantee, share))
    })?;

    info!(marker_id, grantee_id = grantee.id, can_edit = share.can_edit, "Marker shared");
    Ok(ShareResponse {
        marker_id,
        username: grantee.username,
        can_edit: share.can_edit,
    })
}

pub fn list_shares(
    db: &Database,
    owner_id: i64,
    marker_id: i64,
) -> Result<Vec<ShareEntry>, ApiError> {
    db.transaction(|conn| access::authorize(conn, owner_id, marker_id, Action::ManageShares))?;

    let shares = db
        .list_shares(marker_id)?
        .into_iter()
        .map(|row| ShareEntry {
            share_id: row.share_id,
            user_id: row.user_id,
            username: row.username,
            can_edit: row.can_edit,
        })
        .collect();

    Ok(shares)
}

pub fn remove_share(
    db: &Database,
    owner_id: i64,
    marker_id: i64,
    grantee_id: i64,
) -> Result<(), ApiError> {
    db.transaction(|conn| {
        access::authorize(conn, owner_id, marker_id, Action::ManageShares)?;
        if !queries::remove_share(conn, marker_id, grantee_id)? {
            return Err(ApiError::share_not_found());
        }
        Ok::<_, ApiError>(())
    })?;

    info!(marker_id, grantee_id, "Marker share removed");
    Ok(())
}

fn listing_capabilities(row: &MarkerListingRow) -> Capabilities {
    match row.share_can_edit {
        Some(can_edit) => Capabilities::grantee(can_edit),
        None => Capabilities::OWNER,
    }
}

fn annotate(marker: MarkerRow, owner_username: String, caps: Capabilities) -> MarkerResponse {
    MarkerResponse {
        id: marker.id,
        owner_id: marker.owner_id,
        owner_username,
        title: marker.title,
        note: marker.note,
        lat: marker.lat,
        lng: marker.lng,
        visible: marker.visible,
        created_at: marker.created_at,
        updated_at: marker.updated_at,
        can_edit: caps.edit,
        can_delete: caps.delete,
    }
}

fn owner_username(db: &Database, marker: &MarkerRow) -> Result<String, ApiError> {
    let owner = db
        .get_user_by_id(marker.owner_id)?
        .ok_or_else(|| anyhow::anyhow!("Marker {} has no owner row", marker.id))?;
    Ok(owner.username)
}

/// `now`, unless the clock has not moved past `prev`; then one microsecond
/// after `prev`.
fn next_updated_at(prev: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > prev {
        now
    } else {
        prev + Duration::microseconds(1)
    }
}

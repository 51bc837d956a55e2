//! Who may do what with a marker.
//!
//! The owner holds every capability. A grantee with a share may view, and
//! edit when the share says so, but never delete or manage shares. Anyone
//! else gets nothing, and is told the marker does not exist. Viewing is
//! implied by resolving to any capabilities at all.

use tracing::debug;

use navi_db::models::{MarkerRow, ShareRow};
use navi_db::{Connection, queries};

use crate::error::ApiError;

/// What a caller who can see a marker may additionally do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub edit: bool,
    pub delete: bool,
    pub manage_shares: bool,
}

impl Capabilities {
    pub const OWNER: Self = Self {
        edit: true,
        delete: true,
        manage_shares: true,
    };

    pub fn grantee(can_edit: bool) -> Self {
        Self {
            edit: can_edit,
            delete: false,
            manage_shares: false,
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Edit => self.edit,
            Action::Delete => self.delete,
            Action::ManageShares => self.manage_shares,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Edit,
    Delete,
    ManageShares,
}

/// Capabilities of `user_id` on `marker`, or `None` when the marker is
/// missing or invisible to them. A share only counts if it links this
/// marker to this user.
pub fn resolve(
    user_id: i64,
    marker: Option<&MarkerRow>,
    share: Option<&ShareRow>,
) -> Option<Capabilities> {
    let marker = marker?;

    if marker.owner_id == user_id {
        return Some(Capabilities::OWNER);
    }

    share
        .filter(|s| s.marker_id == marker.id && s.user_id == user_id)
        .map(|s| Capabilities::grantee(s.can_edit))
}

/// Load `marker_id` and check that `user_id` may perform `action` on it.
/// Every refusal is `MARKER_NOT_FOUND`. Run it inside the same transaction
/// as the write it guards.
pub fn authorize(
    conn: &Connection,
    user_id: i64,
    marker_id: i64,
    action: Action,
) -> Result<(MarkerRow, Capabilities), ApiError> {
    let marker = queries::find_marker(conn, marker_id)?;

    let share = match &marker {
        Some(m) if m.owner_id != user_id => queries::find_share(conn, marker_id, user_id)?,
        _ => None,
    };

    match resolve(user_id, marker.as_ref(), share.as_ref()) {
        Some(caps) if caps.allows(action) => match marker {
            Some(marker) => Ok((marker, caps)),
            None => Err(ApiError::marker_not_found()),
        },
        _ => {
            debug!(user_id, marker_id, ?action, "Marker access refused");
            Err(ApiError::marker_not_found())
        }
    }
}

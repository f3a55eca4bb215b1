//! Path-addressed inputs computed outside the core: validation markers,
//! presence records and the current user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMarker {
    pub path: Path,
    pub level: ValidationLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Another session editing (or looking at) a location in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormNodePresence {
    pub user: PresenceUser,
    pub path: Path,
    pub session_id: String,
    pub last_active_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Validation markers addressed exactly at `path`.
pub(crate) fn validation_at(markers: &[ValidationMarker], path: &Path) -> Vec<ValidationMarker> {
    markers.iter().filter(|m| &m.path == path).cloned().collect()
}

/// Presence records addressed exactly at `path`.
pub(crate) fn presence_at(presence: &[FormNodePresence], path: &Path) -> Vec<FormNodePresence> {
    presence.iter().filter(|p| &p.path == path).cloned().collect()
}

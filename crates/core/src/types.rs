use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OrganizationId, ShiftId, VolunteerId};

/// Root aggregate owning volunteers and shifts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A person that can be scheduled onto shifts of their organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volunteer {
    pub id: VolunteerId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A bounded time interval during which volunteers serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: ShiftId,
    pub organization_id: OrganizationId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shift {
    /// Length of the shift. Always positive for persisted shifts.
    pub fn duration(&self) -> Duration {
        self.ends_at - self.starts_at
    }
}

/// Link between a volunteer and a shift. The pair is the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub volunteer_id: VolunteerId,
    pub shift_id: ShiftId,
    pub created_at: DateTime<Utc>,
}

/// Candidate organization supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
}

/// Candidate volunteer supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVolunteer {
    pub name: String,
    pub organization_id: OrganizationId,
}

/// Candidate shift supplied by a caller.
///
/// Both timestamps are optional here so that a missing value surfaces as a
/// presence failure instead of being unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShift {
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    pub organization_id: OrganizationId,
}

/// Start and end of a shift after validation: `ends_at > starts_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShiftWindow {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl ShiftWindow {
    pub fn duration(&self) -> Duration {
        self.ends_at - self.starts_at
    }
}

/// Result of linking a volunteer to a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentOutcome {
    Assigned,
    AlreadyAssigned,
}

impl AssignmentOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::AlreadyAssigned => "already_assigned",
        }
    }
}

/// Result of unlinking a volunteer from a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignOutcome {
    Removed,
    NotAssigned,
}

impl UnassignOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Removed => "removed",
            Self::NotAssigned => "not_assigned",
        }
    }
}

/// Rows removed when an organization is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrganizationRemoval {
    pub volunteers: u64,
    pub shifts: u64,
    pub assignments: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn shift_duration_is_end_minus_start() {
        let shift = Shift {
            id: ShiftId::from("s-1"),
            organization_id: OrganizationId::from("o-1"),
            starts_at: Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap(),
            created_at: Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap(),
        };

        assert_eq!(shift.duration(), Duration::hours(4));
    }

    #[test]
    fn new_shift_accepts_missing_timestamps() {
        let candidate: NewShift =
            serde_json::from_str(r#"{"organization_id":"o-1"}"#).expect("deserialize");
        assert!(candidate.starts_at.is_none());
        assert!(candidate.ends_at.is_none());
    }
}

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use metrics::counter;
use thiserror::Error;
use tracing::{debug, info, warn};

use shiftboard_core::types::{
    Assignment, AssignmentOutcome, NewOrganization, NewShift, NewVolunteer, Organization,
    OrganizationRemoval, Shift, UnassignOutcome, Volunteer,
};
use shiftboard_core::validation::{validate_organization, validate_shift, validate_volunteer};
use shiftboard_core::{OrganizationId, ShiftId, ValidationErrors, VolunteerId};
use shiftboard_storage::{Database, StorageError};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Entry point for every scheduling operation.
///
/// Each write validates its input and persists it inside a single
/// transaction, so a failed check leaves storage untouched.
#[derive(Clone)]
pub struct Coordinator {
    database: Database,
    clock: Clock,
}

impl Coordinator {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    // ---- organizations ----

    pub async fn create_organization(
        &self,
        name: impl Into<String>,
    ) -> Result<Organization, CoordinatorError> {
        let candidate = NewOrganization { name: name.into() };
        self.validated(EntityKind::Organization, validate_organization(&candidate))?;

        let now = self.now();
        let organization = Organization {
            id: OrganizationId::generate(),
            name: candidate.name,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.database.begin().await?;
        self.database
            .organizations()
            .insert(&mut tx, &organization)
            .await?;
        tx.commit().await?;

        self.record_write(EntityKind::Organization, "create");
        info!(stage = "coordinator", organization_id = %organization.id, "organization created");
        Ok(organization)
    }

    pub async fn get_organization(
        &self,
        id: &OrganizationId,
    ) -> Result<Organization, CoordinatorError> {
        self.database
            .organizations()
            .fetch(id)
            .await?
            .ok_or_else(|| CoordinatorError::not_found(EntityKind::Organization, id))
    }

    pub async fn list_organizations(&self) -> Result<Vec<Organization>, CoordinatorError> {
        Ok(self.database.organizations().list().await?)
    }

    pub async fn rename_organization(
        &self,
        id: &OrganizationId,
        name: impl Into<String>,
    ) -> Result<Organization, CoordinatorError> {
        let candidate = NewOrganization { name: name.into() };
        self.validated(EntityKind::Organization, validate_organization(&candidate))?;

        let mut tx = self.database.begin().await?;
        let organization = self
            .database
            .organizations()
            .rename(&mut tx, id, &candidate.name, self.now())
            .await?
            .ok_or_else(|| CoordinatorError::not_found(EntityKind::Organization, id))?;
        tx.commit().await?;

        self.record_write(EntityKind::Organization, "update");
        Ok(organization)
    }

    /// Deletes the organization together with its volunteers, shifts and
    /// every assignment touching them.
    pub async fn delete_organization(
        &self,
        id: &OrganizationId,
    ) -> Result<OrganizationRemoval, CoordinatorError> {
        let mut tx = self.database.begin().await?;
        let removal = self
            .database
            .organizations()
            .delete(&mut tx, id)
            .await?
            .ok_or_else(|| CoordinatorError::not_found(EntityKind::Organization, id))?;
        tx.commit().await?;

        self.record_write(EntityKind::Organization, "delete");
        info!(
            stage = "coordinator",
            organization_id = %id,
            volunteers = removal.volunteers,
            shifts = removal.shifts,
            assignments = removal.assignments,
            "organization deleted"
        );
        Ok(removal)
    }

    /// Volunteers of the organization ordered by name.
    pub async fn list_volunteers(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Volunteer>, CoordinatorError> {
        self.get_organization(organization_id).await?;
        Ok(self
            .database
            .volunteers()
            .list_for_organization(organization_id)
            .await?)
    }

    /// Shifts of the organization in chronological order.
    pub async fn list_shifts(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Shift>, CoordinatorError> {
        self.get_organization(organization_id).await?;
        Ok(self
            .database
            .shifts()
            .list_for_organization(organization_id)
            .await?)
    }

    // ---- volunteers ----

    pub async fn create_volunteer(
        &self,
        name: impl Into<String>,
        organization_id: &OrganizationId,
    ) -> Result<Volunteer, CoordinatorError> {
        let candidate = NewVolunteer {
            name: name.into(),
            organization_id: organization_id.clone(),
        };

        let mut tx = self.database.begin().await?;
        let organization_exists = self
            .database
            .organizations()
            .exists(&mut tx, &candidate.organization_id)
            .await?;
        self.validated(
            EntityKind::Volunteer,
            validate_volunteer(&candidate, organization_exists),
        )?;

        let now = self.now();
        let volunteer = Volunteer {
            id: VolunteerId::generate(),
            organization_id: candidate.organization_id,
            name: candidate.name,
            created_at: now,
            updated_at: now,
        };
        self.database.volunteers().insert(&mut tx, &volunteer).await?;
        tx.commit().await?;

        self.record_write(EntityKind::Volunteer, "create");
        info!(
            stage = "coordinator",
            volunteer_id = %volunteer.id,
            organization_id = %volunteer.organization_id,
            "volunteer created"
        );
        Ok(volunteer)
    }

    pub async fn get_volunteer(&self, id: &VolunteerId) -> Result<Volunteer, CoordinatorError> {
        self.database
            .volunteers()
            .fetch(id)
            .await?
            .ok_or_else(|| CoordinatorError::not_found(EntityKind::Volunteer, id))
    }

    pub async fn rename_volunteer(
        &self,
        id: &VolunteerId,
        name: impl Into<String>,
    ) -> Result<Volunteer, CoordinatorError> {
        let volunteers = self.database.volunteers();
        let mut tx = self.database.begin().await?;
        let existing = volunteers
            .fetch_in(&mut tx, id)
            .await?
            .ok_or_else(|| CoordinatorError::not_found(EntityKind::Volunteer, id))?;

        let candidate = NewVolunteer {
            name: name.into(),
            organization_id: existing.organization_id,
        };
        self.validated(EntityKind::Volunteer, validate_volunteer(&candidate, true))?;

        let volunteer = volunteers
            .rename(&mut tx, id, &candidate.name, self.now())
            .await?
            .ok_or_else(|| CoordinatorError::not_found(EntityKind::Volunteer, id))?;
        tx.commit().await?;

        self.record_write(EntityKind::Volunteer, "update");
        Ok(volunteer)
    }

    /// Deletes the volunteer. Shifts they were assigned to are kept; only the
    /// links go away.
    pub async fn delete_volunteer(&self, id: &VolunteerId) -> Result<(), CoordinatorError> {
        let mut tx = self.database.begin().await?;
        if !self.database.volunteers().delete(&mut tx, id).await? {
            return Err(CoordinatorError::not_found(EntityKind::Volunteer, id));
        }
        tx.commit().await?;

        self.record_write(EntityKind::Volunteer, "delete");
        info!(stage = "coordinator", volunteer_id = %id, "volunteer deleted");
        Ok(())
    }

    /// Adds the volunteer to the shift. Assigning twice has no further effect.
    ///
    /// Volunteer and shift are not required to share an organization; a
    /// mismatch is logged as a warning.
    pub async fn assign_to_shift(
        &self,
        volunteer_id: &VolunteerId,
        shift_id: &ShiftId,
    ) -> Result<AssignmentOutcome, CoordinatorError> {
        let mut tx = self.database.begin().await?;
        let volunteer = self
            .database
            .volunteers()
            .fetch_in(&mut tx, volunteer_id)
            .await?
            .ok_or_else(|| CoordinatorError::not_found(EntityKind::Volunteer, volunteer_id))?;
        let shift = self
            .database
            .shifts()
            .fetch_in(&mut tx, shift_id)
            .await?
            .ok_or_else(|| CoordinatorError::not_found(EntityKind::Shift, shift_id))?;

        if volunteer.organization_id != shift.organization_id {
            warn!(
                stage = "coordinator",
                %volunteer_id,
                %shift_id,
                volunteer_organization_id = %volunteer.organization_id,
                shift_organization_id = %shift.organization_id,
                "assigning volunteer to a shift of another organization"
            );
        }

        let assignment = Assignment {
            volunteer_id: volunteer.id,
            shift_id: shift.id,
            created_at: self.now(),
        };
        let outcome = self
            .database
            .assignments()
            .insert(&mut tx, &assignment)
            .await?;
        tx.commit().await?;

        counter!("shift_assignments_total", "result" => outcome.as_str()).increment(1);
        debug!(
            stage = "coordinator",
            %volunteer_id,
            %shift_id,
            outcome = outcome.as_str(),
            "assignment processed"
        );
        Ok(outcome)
    }

    /// Removes the volunteer from the shift when linked; otherwise a no-op.
    pub async fn unassign_from_shift(
        &self,
        volunteer_id: &VolunteerId,
        shift_id: &ShiftId,
    ) -> Result<UnassignOutcome, CoordinatorError> {
        let mut tx = self.database.begin().await?;
        let outcome = self
            .database
            .assignments()
            .delete(&mut tx, volunteer_id, shift_id)
            .await?;
        tx.commit().await?;

        counter!("shift_assignments_total", "result" => outcome.as_str()).increment(1);
        debug!(
            stage = "coordinator",
            %volunteer_id,
            %shift_id,
            outcome = outcome.as_str(),
            "unassignment processed"
        );
        Ok(outcome)
    }

    pub async fn list_volunteer_shifts(
        &self,
        volunteer_id: &VolunteerId,
    ) -> Result<Vec<Shift>, CoordinatorError> {
        self.get_volunteer(volunteer_id).await?;
        Ok(self.database.shifts().list_for_volunteer(volunteer_id).await?)
    }

    // ---- shifts ----

    /// Creates a shift. Missing timestamps are reported as presence failures
    /// before the ordering rule is considered.
    pub async fn create_shift(
        &self,
        starts_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
        organization_id: &OrganizationId,
    ) -> Result<Shift, CoordinatorError> {
        let candidate = NewShift {
            starts_at,
            ends_at,
            organization_id: organization_id.clone(),
        };

        let mut tx = self.database.begin().await?;
        let organization_exists = self
            .database
            .organizations()
            .exists(&mut tx, &candidate.organization_id)
            .await?;
        let window = self.validated(
            EntityKind::Shift,
            validate_shift(&candidate, organization_exists),
        )?;

        let now = self.now();
        let shift = Shift {
            id: ShiftId::generate(),
            organization_id: candidate.organization_id,
            starts_at: window.starts_at,
            ends_at: window.ends_at,
            created_at: now,
            updated_at: now,
        };
        self.database.shifts().insert(&mut tx, &shift).await?;
        tx.commit().await?;

        self.record_write(EntityKind::Shift, "create");
        info!(
            stage = "coordinator",
            shift_id = %shift.id,
            organization_id = %shift.organization_id,
            starts_at = %shift.starts_at,
            ends_at = %shift.ends_at,
            "shift created"
        );
        Ok(shift)
    }

    pub async fn get_shift(&self, id: &ShiftId) -> Result<Shift, CoordinatorError> {
        self.database
            .shifts()
            .fetch(id)
            .await?
            .ok_or_else(|| CoordinatorError::not_found(EntityKind::Shift, id))
    }

    /// Moves an existing shift, applying the same rules as creation.
    pub async fn reschedule_shift(
        &self,
        id: &ShiftId,
        starts_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Result<Shift, CoordinatorError> {
        let shifts = self.database.shifts();
        let mut tx = self.database.begin().await?;
        let existing = shifts
            .fetch_in(&mut tx, id)
            .await?
            .ok_or_else(|| CoordinatorError::not_found(EntityKind::Shift, id))?;

        let candidate = NewShift {
            starts_at,
            ends_at,
            organization_id: existing.organization_id,
        };
        let window = self.validated(EntityKind::Shift, validate_shift(&candidate, true))?;

        let shift = shifts
            .reschedule(&mut tx, id, window, self.now())
            .await?
            .ok_or_else(|| CoordinatorError::not_found(EntityKind::Shift, id))?;
        tx.commit().await?;

        self.record_write(EntityKind::Shift, "update");
        Ok(shift)
    }

    /// Deletes the shift. Assigned volunteers are kept; only the links go away.
    pub async fn delete_shift(&self, id: &ShiftId) -> Result<(), CoordinatorError> {
        let mut tx = self.database.begin().await?;
        if !self.database.shifts().delete(&mut tx, id).await? {
            return Err(CoordinatorError::not_found(EntityKind::Shift, id));
        }
        tx.commit().await?;

        self.record_write(EntityKind::Shift, "delete");
        info!(stage = "coordinator", shift_id = %id, "shift deleted");
        Ok(())
    }

    /// Volunteers assigned to the shift ordered by name.
    pub async fn list_shift_volunteers(
        &self,
        shift_id: &ShiftId,
    ) -> Result<Vec<Volunteer>, CoordinatorError> {
        self.get_shift(shift_id).await?;
        Ok(self.database.volunteers().list_for_shift(shift_id).await?)
    }

    fn validated<T>(
        &self,
        entity: EntityKind,
        result: Result<T, ValidationErrors>,
    ) -> Result<T, CoordinatorError> {
        result.map_err(|errors| {
            counter!("coordinator_validation_failures_total", "entity" => entity.as_str())
                .increment(1);
            debug!(
                stage = "coordinator",
                entity = entity.as_str(),
                failures = errors.errors().len(),
                %errors,
                "validation failed"
            );
            CoordinatorError::Validation(errors)
        })
    }

    fn record_write(&self, entity: EntityKind, op: &'static str) {
        counter!("coordinator_writes_total", "entity" => entity.as_str(), "op" => op)
            .increment(1);
    }
}

/// Entity named in a [`CoordinatorError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Organization,
    Volunteer,
    Shift,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Volunteer => "volunteer",
            Self::Shift => "shift",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CoordinatorError {
    fn not_found(entity: EntityKind, id: &impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the validation failures when this is a validation error.
    pub fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<sqlx::Error> for CoordinatorError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(StorageError::from(err))
    }
}

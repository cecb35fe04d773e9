use std::{str::FromStr, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Row, Sqlite, SqlitePool, Transaction,
};
use thiserror::Error;
use tracing::info;

use shiftboard_core::types::{
    Assignment, AssignmentOutcome, Organization, OrganizationRemoval, Shift, ShiftWindow,
    UnassignOutcome, Volunteer,
};
use shiftboard_core::{OrganizationId, ShiftId, VolunteerId};

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    ///
    /// Every pooled connection enforces foreign keys, which the cascade rules rely on.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StorageError::InvalidUrl)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_millis(5000));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        info!(stage = "storage", "migrations applied");
        Ok(())
    }

    /// Begins a SQLite transaction. Dropping it without commit rolls back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, StorageError> {
        Ok(self.pool.begin().await?)
    }

    /// Returns a handle for interacting with organizations.
    pub fn organizations(&self) -> OrganizationRepository {
        OrganizationRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for interacting with volunteers.
    pub fn volunteers(&self) -> VolunteerRepository {
        VolunteerRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for interacting with shifts.
    pub fn shifts(&self) -> ShiftRepository {
        ShiftRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for the volunteer/shift linking table.
    pub fn assignments(&self) -> AssignmentRepository {
        AssignmentRepository
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid sqlite connection string: {0}")]
    InvalidUrl(sqlx::Error),
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository for the `organizations` table.
#[derive(Clone)]
pub struct OrganizationRepository {
    pool: SqlitePool,
}

impl OrganizationRepository {
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        organization: &Organization,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO organizations (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(organization.id.as_str())
        .bind(&organization.name)
        .bind(to_rfc3339(organization.created_at))
        .bind(to_rfc3339(organization.updated_at))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Checks existence inside the caller's transaction.
    pub async fn exists(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &OrganizationId,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM organizations WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row.is_some())
    }

    pub async fn fetch(&self, id: &OrganizationId) -> Result<Option<Organization>, StorageError> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, created_at, updated_at FROM organizations WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(OrganizationRow::into_domain))
    }

    /// Lists all organizations ordered by name.
    pub async fn list(&self) -> Result<Vec<Organization>, StorageError> {
        let rows = sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, created_at, updated_at FROM organizations ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(OrganizationRow::into_domain).collect())
    }

    /// Updates the name, returning the stored record or `None` when the id is unknown.
    pub async fn rename(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &OrganizationId,
        name: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Organization>, StorageError> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "UPDATE organizations SET name = ?, updated_at = ? WHERE id = ? \
             RETURNING id, name, created_at, updated_at",
        )
        .bind(name)
        .bind(to_rfc3339(updated_at))
        .bind(id.as_str())
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(OrganizationRow::into_domain))
    }

    /// Deletes the organization. Owned volunteers, shifts and their
    /// assignments go with it through `ON DELETE CASCADE`.
    pub async fn delete(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &OrganizationId,
    ) -> Result<Option<OrganizationRemoval>, StorageError> {
        let counts = sqlx::query(
            "SELECT \
               (SELECT COUNT(*) FROM volunteers WHERE organization_id = ?1) AS volunteers, \
               (SELECT COUNT(*) FROM shifts WHERE organization_id = ?1) AS shifts, \
               (SELECT COUNT(*) FROM shift_assignments AS a \
                  WHERE a.volunteer_id IN (SELECT id FROM volunteers WHERE organization_id = ?1) \
                     OR a.shift_id IN (SELECT id FROM shifts WHERE organization_id = ?1)) AS assignments",
        )
        .bind(id.as_str())
        .fetch_one(&mut **tx)
        .await?;

        let result = sqlx::query("DELETE FROM organizations WHERE id = ?")
            .bind(id.as_str())
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let volunteers: i64 = counts.get("volunteers");
        let shifts: i64 = counts.get("shifts");
        let assignments: i64 = counts.get("assignments");
        Ok(Some(OrganizationRemoval {
            volunteers: volunteers as u64,
            shifts: shifts as u64,
            assignments: assignments as u64,
        }))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrganizationRow {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizationRow {
    fn into_domain(self) -> Organization {
        Organization {
            id: OrganizationId::from(self.id),
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for the `volunteers` table.
#[derive(Clone)]
pub struct VolunteerRepository {
    pool: SqlitePool,
}

const VOLUNTEER_COLUMNS: &str = "v.id AS id, v.organization_id AS organization_id, v.name AS name, \
     v.created_at AS created_at, v.updated_at AS updated_at";

impl VolunteerRepository {
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        volunteer: &Volunteer,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO volunteers (id, organization_id, name, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(volunteer.id.as_str())
        .bind(volunteer.organization_id.as_str())
        .bind(&volunteer.name)
        .bind(to_rfc3339(volunteer.created_at))
        .bind(to_rfc3339(volunteer.updated_at))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn fetch(&self, id: &VolunteerId) -> Result<Option<Volunteer>, StorageError> {
        let row = sqlx::query_as::<_, VolunteerRow>(&format!(
            "SELECT {VOLUNTEER_COLUMNS} FROM volunteers AS v WHERE v.id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(VolunteerRow::into_domain))
    }

    /// Same as [`Self::fetch`] but reads through the caller's transaction.
    pub async fn fetch_in(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &VolunteerId,
    ) -> Result<Option<Volunteer>, StorageError> {
        let row = sqlx::query_as::<_, VolunteerRow>(&format!(
            "SELECT {VOLUNTEER_COLUMNS} FROM volunteers AS v WHERE v.id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(VolunteerRow::into_domain))
    }

    /// Lists the volunteers of an organization ordered by name.
    pub async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Volunteer>, StorageError> {
        let rows = sqlx::query_as::<_, VolunteerRow>(&format!(
            "SELECT {VOLUNTEER_COLUMNS} FROM volunteers AS v \
             WHERE v.organization_id = ? ORDER BY v.name, v.id"
        ))
        .bind(organization_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(VolunteerRow::into_domain).collect())
    }

    /// Lists the volunteers assigned to a shift ordered by name.
    pub async fn list_for_shift(&self, shift_id: &ShiftId) -> Result<Vec<Volunteer>, StorageError> {
        let rows = sqlx::query_as::<_, VolunteerRow>(&format!(
            "SELECT {VOLUNTEER_COLUMNS} FROM volunteers AS v \
             JOIN shift_assignments AS a ON a.volunteer_id = v.id \
             WHERE a.shift_id = ? ORDER BY v.name, v.id"
        ))
        .bind(shift_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(VolunteerRow::into_domain).collect())
    }

    pub async fn rename(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &VolunteerId,
        name: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Volunteer>, StorageError> {
        let row = sqlx::query_as::<_, VolunteerRow>(
            "UPDATE volunteers SET name = ?, updated_at = ? WHERE id = ? \
             RETURNING id, organization_id, name, created_at, updated_at",
        )
        .bind(name)
        .bind(to_rfc3339(updated_at))
        .bind(id.as_str())
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(VolunteerRow::into_domain))
    }

    /// Deletes the volunteer and, by cascade, its assignments. Returns `false`
    /// when nothing was deleted.
    pub async fn delete(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &VolunteerId,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM volunteers WHERE id = ?")
            .bind(id.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VolunteerRow {
    id: String,
    organization_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VolunteerRow {
    fn into_domain(self) -> Volunteer {
        Volunteer {
            id: VolunteerId::from(self.id),
            organization_id: OrganizationId::from(self.organization_id),
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for the `shifts` table.
#[derive(Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

const SHIFT_COLUMNS: &str = "s.id AS id, s.organization_id AS organization_id, \
     s.starts_at AS starts_at, s.ends_at AS ends_at, s.created_at AS created_at, \
     s.updated_at AS updated_at";

impl ShiftRepository {
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        shift: &Shift,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO shifts (id, organization_id, starts_at, ends_at, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(shift.id.as_str())
        .bind(shift.organization_id.as_str())
        .bind(to_rfc3339(shift.starts_at))
        .bind(to_rfc3339(shift.ends_at))
        .bind(to_rfc3339(shift.created_at))
        .bind(to_rfc3339(shift.updated_at))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn fetch(&self, id: &ShiftId) -> Result<Option<Shift>, StorageError> {
        let row = sqlx::query_as::<_, ShiftRow>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts AS s WHERE s.id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ShiftRow::into_domain))
    }

    pub async fn fetch_in(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &ShiftId,
    ) -> Result<Option<Shift>, StorageError> {
        let row = sqlx::query_as::<_, ShiftRow>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts AS s WHERE s.id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(ShiftRow::into_domain))
    }

    /// Lists the shifts of an organization in chronological order.
    pub async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Shift>, StorageError> {
        let rows = sqlx::query_as::<_, ShiftRow>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts AS s \
             WHERE s.organization_id = ? ORDER BY s.starts_at, s.id"
        ))
        .bind(organization_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ShiftRow::into_domain).collect())
    }

    /// Lists the shifts a volunteer is assigned to in chronological order.
    pub async fn list_for_volunteer(
        &self,
        volunteer_id: &VolunteerId,
    ) -> Result<Vec<Shift>, StorageError> {
        let rows = sqlx::query_as::<_, ShiftRow>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts AS s \
             JOIN shift_assignments AS a ON a.shift_id = s.id \
             WHERE a.volunteer_id = ? ORDER BY s.starts_at, s.id"
        ))
        .bind(volunteer_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ShiftRow::into_domain).collect())
    }

    /// Moves the shift to a new window, returning `None` when the id is unknown.
    pub async fn reschedule(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &ShiftId,
        window: ShiftWindow,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Shift>, StorageError> {
        let row = sqlx::query_as::<_, ShiftRow>(
            "UPDATE shifts SET starts_at = ?, ends_at = ?, updated_at = ? WHERE id = ? \
             RETURNING id, organization_id, starts_at, ends_at, created_at, updated_at",
        )
        .bind(to_rfc3339(window.starts_at))
        .bind(to_rfc3339(window.ends_at))
        .bind(to_rfc3339(updated_at))
        .bind(id.as_str())
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(ShiftRow::into_domain))
    }

    pub async fn delete(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &ShiftId,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM shifts WHERE id = ?")
            .bind(id.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ShiftRow {
    id: String,
    organization_id: String,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ShiftRow {
    fn into_domain(self) -> Shift {
        Shift {
            id: ShiftId::from(self.id),
            organization_id: OrganizationId::from(self.organization_id),
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for the `shift_assignments` linking table. Links are only
/// written inside a caller's transaction; reads go through the joins on
/// [`VolunteerRepository`] and [`ShiftRepository`].
#[derive(Clone, Copy)]
pub struct AssignmentRepository;

impl AssignmentRepository {
    /// Links the pair. Inserting an existing pair is a no-op.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        assignment: &Assignment,
    ) -> Result<AssignmentOutcome, StorageError> {
        let result = sqlx::query(
            "INSERT INTO shift_assignments (volunteer_id, shift_id, created_at) VALUES (?, ?, ?) \
             ON CONFLICT(volunteer_id, shift_id) DO NOTHING",
        )
        .bind(assignment.volunteer_id.as_str())
        .bind(assignment.shift_id.as_str())
        .bind(to_rfc3339(assignment.created_at))
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            Ok(AssignmentOutcome::AlreadyAssigned)
        } else {
            Ok(AssignmentOutcome::Assigned)
        }
    }

    pub async fn delete(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        volunteer_id: &VolunteerId,
        shift_id: &ShiftId,
    ) -> Result<UnassignOutcome, StorageError> {
        let result =
            sqlx::query("DELETE FROM shift_assignments WHERE volunteer_id = ? AND shift_id = ?")
                .bind(volunteer_id.as_str())
                .bind(shift_id.as_str())
                .execute(&mut **tx)
                .await?;

        if result.rows_affected() == 0 {
            Ok(UnassignOutcome::NotAssigned)
        } else {
            Ok(UnassignOutcome::Removed)
        }
    }
}

/// Fixed-width UTC rendering with nanoseconds. Text comparison in SQL
/// matches time order for four-digit years, which shift validation enforces.
fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    async fn setup_db() -> (TempDir, Database) {
        let dir = TempDir::new().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("test.db").display());
        let db = Database::connect(&url).await.expect("connect");
        db.run_migrations().await.expect("migrations");
        (dir, db)
    }

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, hour, 0, 0).unwrap()
    }

    fn organization(id: &str, name: &str) -> Organization {
        Organization {
            id: OrganizationId::from(id),
            name: name.to_string(),
            created_at: ts(0),
            updated_at: ts(0),
        }
    }

    fn volunteer(id: &str, organization_id: &str, name: &str) -> Volunteer {
        Volunteer {
            id: VolunteerId::from(id),
            organization_id: OrganizationId::from(organization_id),
            name: name.to_string(),
            created_at: ts(0),
            updated_at: ts(0),
        }
    }

    fn shift(id: &str, organization_id: &str, start: u32, end: u32) -> Shift {
        Shift {
            id: ShiftId::from(id),
            organization_id: OrganizationId::from(organization_id),
            starts_at: ts(start),
            ends_at: ts(end),
            created_at: ts(0),
            updated_at: ts(0),
        }
    }

    fn link(volunteer_id: &str, shift_id: &str) -> Assignment {
        Assignment {
            volunteer_id: VolunteerId::from(volunteer_id),
            shift_id: ShiftId::from(shift_id),
            created_at: ts(1),
        }
    }

    async fn count_links(db: &Database) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shift_assignments")
            .fetch_one(db.pool())
            .await
            .expect("count links");
        count
    }

    async fn seed(db: &Database) {
        let mut tx = db.begin().await.expect("begin");
        db.organizations()
            .insert(&mut tx, &organization("o-1", "Habitat"))
            .await
            .expect("org");
        db.volunteers()
            .insert(&mut tx, &volunteer("v-1", "o-1", "Alice"))
            .await
            .expect("volunteer");
        db.shifts()
            .insert(&mut tx, &shift("s-1", "o-1", 8, 12))
            .await
            .expect("shift");
        tx.commit().await.expect("commit");
    }

    #[tokio::test]
    async fn migrations_apply() {
        let (_dir, db) = setup_db().await;
        let tables: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('organizations', 'volunteers', 'shifts', 'shift_assignments')",
        )
        .fetch_one(db.pool())
        .await
        .expect("fetch tables");
        assert_eq!(tables.0, 4);
    }

    #[tokio::test]
    async fn round_trips_timestamps() {
        let (_dir, db) = setup_db().await;
        seed(&db).await;

        let stored = db
            .shifts()
            .fetch(&ShiftId::from("s-1"))
            .await
            .expect("fetch")
            .expect("present");
        assert_eq!(stored.starts_at, ts(8));
        assert_eq!(stored.ends_at, ts(12));
    }

    #[tokio::test]
    async fn volunteer_insert_rejects_unknown_organization() {
        let (_dir, db) = setup_db().await;
        let mut tx = db.begin().await.expect("begin");
        let err = db
            .volunteers()
            .insert(&mut tx, &volunteer("v-9", "missing", "Bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Database(_)));
    }

    #[tokio::test]
    async fn duplicate_assignment_is_ignored() {
        let (_dir, db) = setup_db().await;
        seed(&db).await;
        let repo = db.assignments();

        let mut tx = db.begin().await.expect("begin");
        let first = repo.insert(&mut tx, &link("v-1", "s-1")).await.expect("insert");
        let second = repo.insert(&mut tx, &link("v-1", "s-1")).await.expect("insert");
        tx.commit().await.expect("commit");

        assert_eq!(first, AssignmentOutcome::Assigned);
        assert_eq!(second, AssignmentOutcome::AlreadyAssigned);
        let listed = db
            .volunteers()
            .list_for_shift(&ShiftId::from("s-1"))
            .await
            .expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(count_links(&db).await, 1);
    }

    #[tokio::test]
    async fn deleting_missing_link_reports_not_assigned() {
        let (_dir, db) = setup_db().await;
        seed(&db).await;
        let mut tx = db.begin().await.expect("begin");
        let outcome = db
            .assignments()
            .delete(&mut tx, &VolunteerId::from("v-1"), &ShiftId::from("s-1"))
            .await
            .expect("delete");
        assert_eq!(outcome, UnassignOutcome::NotAssigned);
    }

    #[tokio::test]
    async fn organization_delete_cascades() {
        let (_dir, db) = setup_db().await;
        seed(&db).await;

        let mut tx = db.begin().await.expect("begin");
        db.assignments()
            .insert(&mut tx, &link("v-1", "s-1"))
            .await
            .expect("link");
        let removal = db
            .organizations()
            .delete(&mut tx, &OrganizationId::from("o-1"))
            .await
            .expect("delete")
            .expect("organization existed");
        tx.commit().await.expect("commit");

        assert_eq!(
            removal,
            OrganizationRemoval {
                volunteers: 1,
                shifts: 1,
                assignments: 1,
            }
        );
        assert!(db
            .volunteers()
            .fetch(&VolunteerId::from("v-1"))
            .await
            .expect("fetch")
            .is_none());
        assert!(db
            .shifts()
            .fetch(&ShiftId::from("s-1"))
            .await
            .expect("fetch")
            .is_none());
        assert_eq!(count_links(&db).await, 0);
    }

    #[tokio::test]
    async fn delete_unknown_organization_returns_none() {
        let (_dir, db) = setup_db().await;
        let mut tx = db.begin().await.expect("begin");
        let removal = db
            .organizations()
            .delete(&mut tx, &OrganizationId::from("missing"))
            .await
            .expect("delete");
        assert!(removal.is_none());
    }

    #[tokio::test]
    async fn shifts_are_listed_chronologically() {
        let (_dir, db) = setup_db().await;
        seed(&db).await;
        let mut tx = db.begin().await.expect("begin");
        db.shifts()
            .insert(&mut tx, &shift("s-0", "o-1", 6, 7))
            .await
            .expect("shift");
        tx.commit().await.expect("commit");

        let shifts = db
            .shifts()
            .list_for_organization(&OrganizationId::from("o-1"))
            .await
            .expect("list");
        let ids: Vec<_> = shifts.iter().map(|shift| shift.id.as_str()).collect();
        assert_eq!(ids, vec!["s-0", "s-1"]);
    }

    #[tokio::test]
    async fn nanosecond_timestamps_keep_their_order() {
        let (_dir, db) = setup_db().await;
        seed(&db).await;
        let starts_at = ts(8) + chrono::Duration::nanoseconds(100);
        let ends_at = ts(8) + chrono::Duration::nanoseconds(900);

        let mut tx = db.begin().await.expect("begin");
        db.shifts()
            .insert(
                &mut tx,
                &Shift {
                    starts_at,
                    ends_at,
                    ..shift("s-ns", "o-1", 8, 9)
                },
            )
            .await
            .expect("sub-microsecond window passes the CHECK");
        tx.commit().await.expect("commit");

        let stored = db
            .shifts()
            .fetch(&ShiftId::from("s-ns"))
            .await
            .expect("fetch")
            .expect("present");
        assert_eq!(stored.starts_at, starts_at);
        assert_eq!(stored.ends_at, ends_at);
    }

    #[tokio::test]
    async fn rejects_inverted_window_at_schema_level() {
        let (_dir, db) = setup_db().await;
        seed(&db).await;
        let mut tx = db.begin().await.expect("begin");
        let err = db
            .shifts()
            .insert(&mut tx, &shift("s-bad", "o-1", 12, 8))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Database(_)));
    }
}

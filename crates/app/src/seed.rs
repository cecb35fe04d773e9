//! Demo data set loaded by the binary when `APP_SEED` is enabled.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::info;

use shiftboard_core::OrganizationId;

use crate::coordinator::{Coordinator, CoordinatorError};

pub const DEMO_ORGANIZATION: &str = "Habitat for Humanity";
const DEMO_VOLUNTEERS: [&str; 2] = ["Alice", "Bob"];

/// What a seed run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub organization_id: OrganizationId,
    pub created: bool,
    pub volunteers: usize,
    pub shifts: usize,
}

fn demo_window() -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let starts_at = Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).single()?;
    let ends_at = Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).single()?;
    Some((starts_at, ends_at))
}

/// Loads the demo organization with two volunteers and one morning shift,
/// with Alice assigned to it.
///
/// Running it again finds the existing organization and creates nothing.
pub async fn seed_demo_data(coordinator: &Coordinator) -> Result<SeedSummary, CoordinatorError> {
    let existing = coordinator
        .list_organizations()
        .await?
        .into_iter()
        .find(|organization| organization.name == DEMO_ORGANIZATION);

    if let Some(organization) = existing {
        let volunteers = coordinator.list_volunteers(&organization.id).await?.len();
        let shifts = coordinator.list_shifts(&organization.id).await?.len();
        info!(stage = "seed", organization_id = %organization.id, "demo data already present");
        return Ok(SeedSummary {
            organization_id: organization.id,
            created: false,
            volunteers,
            shifts,
        });
    }

    let organization = coordinator.create_organization(DEMO_ORGANIZATION).await?;

    let mut volunteers = Vec::with_capacity(DEMO_VOLUNTEERS.len());
    for name in DEMO_VOLUNTEERS {
        volunteers.push(coordinator.create_volunteer(name, &organization.id).await?);
    }

    let (starts_at, ends_at) = demo_window().unzip();
    let shift = coordinator
        .create_shift(starts_at, ends_at, &organization.id)
        .await?;

    if let Some(alice) = volunteers.first() {
        coordinator.assign_to_shift(&alice.id, &shift.id).await?;
    }

    info!(
        stage = "seed",
        organization_id = %organization.id,
        volunteers = volunteers.len(),
        "demo data loaded"
    );
    Ok(SeedSummary {
        organization_id: organization.id,
        created: true,
        volunteers: volunteers.len(),
        shifts: 1,
    })
}

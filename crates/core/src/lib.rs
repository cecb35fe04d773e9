//! Domain layer for volunteer coordination.
//!
//! Hosts the entity types, their identifiers, and the pure validation rules
//! shared by the storage layer and the coordinator. Nothing here performs I/O.

pub mod ids;
pub mod types;
pub mod validation;

pub use ids::{OrganizationId, ShiftId, VolunteerId};
pub use validation::{ValidationError, ValidationErrors};

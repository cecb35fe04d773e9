//! Volunteer coordination: organizations, their volunteers and shifts, and
//! the assignments linking volunteers to shifts.

pub mod coordinator;
pub mod seed;
pub mod telemetry;

pub use coordinator::{Clock, Coordinator, CoordinatorError, EntityKind};

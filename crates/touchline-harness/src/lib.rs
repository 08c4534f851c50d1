//! Deterministic simulation harness for Touchline.
//!
//! Virtual-time implementations of the Environment and Driver traits for
//! deterministic, reproducible testing of the application runtime under
//! connection churn, redelivery and typing timeouts.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the common
//! App invariants.
//!
//! # Scenarios
//!
//! [`Scenario`] runs the real [`touchline_app::Runtime`] over a
//! [`SimDriver`], with the test playing both the user and the server.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod scenario;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    EntriesUnique, Invariant, InvariantRegistry, InvariantResult, MembershipMatchesViews,
    OutboxOnlyWhileOffline, Snapshot, StatusMatchesConnection, TimelineAppendOnly,
    TypingExcludesSelf, ViewSnapshot, Violation,
};
pub use scenario::Scenario;
pub use sim_driver::{DialPolicy, SimDriver, SimDriverError, UserInput};
pub use sim_env::{SimEnv, SimInstant};

//! Branching clinical scenarios: students walk a decision graph one step at a
//! time and get a comparison against the recommended path at the end. Class
//! rosters decide who may open which scenario.

pub mod access;
pub mod config;
pub mod error;
pub mod play;
pub mod report;
pub mod scenario;
pub mod session;
pub mod store;

//! # Proxmap Common
//!
//! Shared vocabulary of the workspace: the proxy domain model, the run
//! configuration, error types and the [`inspect::HostInspector`] port that the
//! core consumes and the OS adapter implements.
//!
//! * **[`proxy`]**: targets, edges, the extracted inventory and resolution records.
//! * **[`inspect`]**: the boundary to live operating-system state.
//! * **[`config`]**: explicit run configuration, passed by reference.
//! * **[`error`]**: recoverable and fatal error kinds.

pub mod config;
pub mod error;
pub mod inspect;
pub mod proxy;

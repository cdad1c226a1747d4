//! # proxmap core
//!
//! The use cases of the tool and the adapters they run on:
//! * [`extract`]: configuration files to an [`Inventory`](proxmap_common::proxy::edge::Inventory).
//! * [`resolver`]: proxy targets to the processes and units behind them.
//! * [`system`]: the live-host [`HostInspector`](proxmap_common::inspect::HostInspector).
//! * [`inventory`]: the application service tying them together.
//! * [`report`]: the plain-text rendering of a run.

pub mod extract;
pub mod inventory;
pub mod report;
pub mod resolver;
pub mod system;

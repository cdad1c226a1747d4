//! # Proxy Domain Model
//!
//! * [`target::Target`]: where a proxy directive forwards to.
//! * [`edge::ProxyEdge`] and [`edge::Inventory`]: what the configuration says.
//! * [`resolution::ResolutionRecord`]: what is actually listening there.

pub mod edge;
pub mod resolution;
pub mod target;

//! # Host Inspector Port
//!
//! The boundary between the resolver and live operating-system state.
//!
//! Every query is best-effort: a missing utility, a permission denial or an
//! empty answer all come back as "nothing found" (an empty `Vec` or `None`).
//! Implementations never fail the run.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

/// A running process as reported by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub command: String,
}

impl ProcessInfo {
    pub fn new(pid: u32, command: impl Into<String>) -> Self {
        Self {
            pid,
            command: command.into(),
        }
    }
}

impl fmt::Display for ProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.command, self.pid)
    }
}

#[async_trait]
pub trait HostInspector: Send + Sync {
    /// Processes with a listening or established TCP socket on local `port`.
    async fn find_processes_by_port(&self, port: u16) -> Vec<ProcessInfo>;

    /// Processes holding the UNIX socket at `path` open.
    async fn find_processes_by_unix_socket(&self, path: &Path) -> Vec<ProcessInfo>;

    /// Processes whose name equals `name`, or failing that whose command
    /// line contains it.
    async fn find_processes_by_name(&self, name: &str) -> Vec<ProcessInfo>;

    /// The systemd unit controlling `pid`, if any.
    async fn find_systemd_unit(&self, pid: u32) -> Option<String>;
}

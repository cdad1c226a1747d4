//! # System Inspector
//!
//! The production [`HostInspector`]: answers the resolver's questions from
//! the live host.
//!
//! * TCP socket ownership comes from `netstat2`.
//! * Process names come from a `sysinfo` snapshot taken at construction.
//! * UNIX socket holders come from `/proc`, then `lsof`.
//! * Units come from `/proc/<pid>/cgroup`, then `systemctl status`.
//!
//! External utilities run under the configured timeout. A utility that
//! cannot be started is reported once and not tried again during the run.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use netstat2::{AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, TcpState, get_sockets_info};
use proxmap_common::config::Config;
use proxmap_common::inspect::{HostInspector, ProcessInfo};
use sysinfo::{Pid, System};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// An external utility. Once it cannot be started it stays unavailable for
/// the rest of the run.
struct Tool {
    program: String,
    unavailable: AtomicBool,
}

impl Tool {
    fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            unavailable: AtomicBool::new(false),
        }
    }

    fn is_unavailable(&self) -> bool {
        self.unavailable.load(Ordering::Relaxed)
    }

    fn mark_unavailable(&self, reason: impl std::fmt::Display) {
        warn_once(&self.unavailable, &self.program, reason);
    }
}

fn warn_once(flag: &AtomicBool, what: &str, reason: impl std::fmt::Display) {
    if !flag.swap(true, Ordering::Relaxed) {
        warn!("{what} is unavailable ({reason}); related lookups are skipped for this run");
    }
}

pub struct SystemInspector {
    system: System,
    lookup_timeout: Duration,
    own_pid: u32,
    socket_table_unavailable: AtomicBool,
    lsof: Tool,
    systemctl: Tool,
}

impl SystemInspector {
    pub fn new(cfg: &Config) -> Self {
        Self {
            system: System::new_all(),
            lookup_timeout: cfg.lookup_timeout,
            own_pid: std::process::id(),
            socket_table_unavailable: AtomicBool::new(false),
            lsof: Tool::new("lsof"),
            systemctl: Tool::new("systemctl"),
        }
    }

    /// Runs an external utility and returns its stdout, or `None` when it is
    /// missing, denied, failed to start or exceeded the timeout.
    async fn run_tool(&self, tool: &Tool, args: &[&str]) -> Option<String> {
        if tool.is_unavailable() {
            return None;
        }

        let mut command = Command::new(&tool.program);
        command.args(args).stdin(Stdio::null()).kill_on_drop(true);

        match timeout(self.lookup_timeout, command.output()).await {
            Err(_) => {
                debug!("{} {} timed out after {:?}", tool.program, args.join(" "), self.lookup_timeout);
                None
            }
            Ok(Err(e)) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                tool.mark_unavailable(e);
                None
            }
            Ok(Err(e)) => {
                debug!("{} {} failed: {e}", tool.program, args.join(" "));
                None
            }
            Ok(Ok(output)) => Some(String::from_utf8_lossy(&output.stdout).into_owned()),
        }
    }

    fn describe(&self, pids: BTreeSet<u32>) -> Vec<ProcessInfo> {
        pids.into_iter()
            .filter(|&pid| pid != self.own_pid)
            .map(|pid| ProcessInfo::new(pid, self.process_name(pid)))
            .collect()
    }

    fn process_name(&self, pid: u32) -> String {
        if let Some(process) = self.system.process(Pid::from_u32(pid)) {
            return process.name().to_string_lossy().into_owned();
        }
        // Started after the snapshot.
        fs::read_to_string(format!("/proc/{pid}/comm"))
            .map(|comm| comm.trim().to_string())
            .unwrap_or_else(|_| String::from("?"))
    }

    fn socket_holders_from_proc(&self, path: &Path) -> BTreeSet<u32> {
        let Ok(table) = fs::read_to_string("/proc/net/unix") else {
            return BTreeSet::new();
        };
        let inodes = parse_proc_net_unix(&table, path);
        if inodes.is_empty() {
            return BTreeSet::new();
        }

        let links: BTreeSet<String> = inodes.iter().map(|inode| format!("socket:[{inode}]")).collect();
        let mut pids: BTreeSet<u32> = BTreeSet::new();

        let Ok(entries) = fs::read_dir("/proc") else {
            return pids;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };
            // Other users' fd tables are unreadable without privileges.
            let Ok(fds) = fs::read_dir(entry.path().join("fd")) else {
                continue;
            };
            let holds_socket = fds
                .filter_map(|fd| fd.ok())
                .filter_map(|fd| fs::read_link(fd.path()).ok())
                .any(|link| link.to_str().is_some_and(|l| links.contains(l)));
            if holds_socket {
                pids.insert(pid);
            }
        }
        pids
    }
}

#[async_trait]
impl HostInspector for SystemInspector {
    async fn find_processes_by_port(&self, port: u16) -> Vec<ProcessInfo> {
        if self.socket_table_unavailable.load(Ordering::Relaxed) {
            return Vec::new();
        }

        let af_flags = AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6;
        let sockets_info = match get_sockets_info(af_flags, ProtocolFlags::TCP) {
            Ok(sockets) => sockets,
            Err(e) => {
                warn_once(&self.socket_table_unavailable, "socket table", e);
                return Vec::new();
            }
        };

        let mut pids: BTreeSet<u32> = BTreeSet::new();
        for si in sockets_info {
            if let ProtocolSocketInfo::Tcp(tcp) = &si.protocol_socket_info
                && tcp.local_port == port
                && matches!(tcp.state, TcpState::Listen | TcpState::Established)
            {
                pids.extend(si.associated_pids.iter().copied());
            }
        }

        debug!("port {port}: pids {pids:?}");
        self.describe(pids)
    }

    async fn find_processes_by_unix_socket(&self, path: &Path) -> Vec<ProcessInfo> {
        let mut pids = self.socket_holders_from_proc(path);

        if pids.is_empty() {
            let path_arg = path.to_string_lossy().into_owned();
            if let Some(stdout) = self.run_tool(&self.lsof, &["-t", path_arg.as_str()]).await {
                pids.extend(parse_pid_lines(&stdout));
            }
        }

        debug!("socket {}: pids {pids:?}", path.display());
        self.describe(pids)
    }

    async fn find_processes_by_name(&self, name: &str) -> Vec<ProcessInfo> {
        let candidates = || {
            self.system
                .processes()
                .iter()
                .filter(|(_, process)| process.thread_kind().is_none())
                .filter(|(pid, _)| pid.as_u32() != self.own_pid)
        };

        let mut found: Vec<ProcessInfo> = candidates()
            .filter(|(_, process)| process.name().to_string_lossy().eq_ignore_ascii_case(name))
            .map(|(pid, process)| ProcessInfo::new(pid.as_u32(), process.name().to_string_lossy()))
            .collect();

        if found.is_empty() {
            found = candidates()
                .filter(|(_, process)| {
                    let cmdline: Vec<String> = process.cmd().iter().map(|arg| arg.to_string_lossy().into_owned()).collect();
                    cmdline.join(" ").contains(name)
                })
                .map(|(pid, process)| ProcessInfo::new(pid.as_u32(), process.name().to_string_lossy()))
                .collect();
        }

        found.sort_by_key(|p| p.pid);
        debug!("name '{name}': {} processes", found.len());
        found
    }

    async fn find_systemd_unit(&self, pid: u32) -> Option<String> {
        if let Ok(cgroup) = fs::read_to_string(format!("/proc/{pid}/cgroup"))
            && let Some(unit) = parse_cgroup_unit(&cgroup)
        {
            return Some(unit);
        }

        let stdout = self
            .run_tool(&self.systemctl, &["status", "--no-pager", &pid.to_string()])
            .await?;
        parse_systemctl_status(&stdout)
    }
}

/// Inodes of the sockets bound to `path` in a `/proc/net/unix` table.
///
/// Columns: `Num RefCount Protocol Flags Type St Inode [Path]`.
fn parse_proc_net_unix(table: &str, path: &Path) -> Vec<u64> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            let bound = cols.get(7)?;
            if Path::new(bound) != path {
                return None;
            }
            cols.get(6)?.parse::<u64>().ok()
        })
        .collect()
}

fn parse_pid_lines(stdout: &str) -> impl Iterator<Item = u32> + '_ {
    stdout.lines().filter_map(|line| line.trim().parse::<u32>().ok())
}

/// The innermost `.service` in a `/proc/<pid>/cgroup` listing, e.g.
/// `0::/system.slice/nginx.service` gives `nginx.service`.
fn parse_cgroup_unit(cgroup: &str) -> Option<String> {
    cgroup
        .lines()
        .filter_map(|line| line.splitn(3, ':').nth(2))
        .filter_map(|path| path.split('/').rev().find(|part| part.ends_with(".service")))
        .next()
        .map(str::to_string)
}

/// The unit named on the first line of `systemctl status <pid>`:
/// `● nginx.service - A high performance web server`.
fn parse_systemctl_status(stdout: &str) -> Option<String> {
    let first = stdout.lines().next()?;
    first
        .split_whitespace()
        .find(|token| token.len() > ".service".len() && token.ends_with(".service"))
        .map(str::to_string)
}

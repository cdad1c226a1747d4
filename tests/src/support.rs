use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use proxmap_common::config::Config;
use proxmap_common::inspect::{HostInspector, ProcessInfo};
use proxmap_common::proxy::edge::ServerKind;
use proxmap_core::inventory::InventoryService;
use tempfile::TempDir;

/// A host whose answers are written up front. Every query is recorded.
#[derive(Default)]
pub struct ScriptedHost {
    ports: HashMap<u16, Vec<ProcessInfo>>,
    sockets: HashMap<PathBuf, Vec<ProcessInfo>>,
    names: HashMap<String, Vec<ProcessInfo>>,
    units: HashMap<u32, String>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listening(mut self, port: u16, pid: u32, command: &str) -> Self {
        self.ports.entry(port).or_default().push(ProcessInfo::new(pid, command));
        self
    }

    pub fn holding_socket(mut self, path: &str, pid: u32, command: &str) -> Self {
        self.sockets
            .entry(PathBuf::from(path))
            .or_default()
            .push(ProcessInfo::new(pid, command));
        self
    }

    pub fn running(mut self, name: &str, pid: u32) -> Self {
        self.names
            .entry(name.to_string())
            .or_default()
            .push(ProcessInfo::new(pid, name));
        self
    }

    pub fn unit(mut self, pid: u32, unit: &str) -> Self {
        self.units.insert(pid, unit.to_string());
        self
    }

    /// Shared view of the queries this host will receive.
    pub fn query_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.queries.clone()
    }

    fn record(&self, query: String) {
        self.queries.lock().unwrap().push(query);
    }
}

#[async_trait]
impl HostInspector for ScriptedHost {
    async fn find_processes_by_port(&self, port: u16) -> Vec<ProcessInfo> {
        self.record(format!("port {port}"));
        self.ports.get(&port).cloned().unwrap_or_default()
    }

    async fn find_processes_by_unix_socket(&self, path: &Path) -> Vec<ProcessInfo> {
        self.record(format!("socket {}", path.display()));
        self.sockets.get(path).cloned().unwrap_or_default()
    }

    async fn find_processes_by_name(&self, name: &str) -> Vec<ProcessInfo> {
        self.record(format!("name {name}"));
        self.names.get(name).cloned().unwrap_or_default()
    }

    async fn find_systemd_unit(&self, pid: u32) -> Option<String> {
        self.record(format!("unit {pid}"));
        self.units.get(&pid).cloned()
    }
}

/// Configuration directories in a temporary root. A server kind's
/// directory only exists once a file has been written for it.
pub struct Fixture {
    root: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    pub fn dir(&self, kind: ServerKind) -> PathBuf {
        self.root.path().join(kind.name()).join("sites-enabled")
    }

    pub fn write(self, kind: ServerKind, name: &str, contents: &str) -> Self {
        let dir = self.dir(kind);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), contents).unwrap();
        self
    }

    pub fn nginx(self, name: &str, contents: &str) -> Self {
        self.write(ServerKind::Nginx, name, contents)
    }

    pub fn apache(self, name: &str, contents: &str) -> Self {
        self.write(ServerKind::Apache, name, contents)
    }

    pub fn config(&self) -> Config {
        Config {
            nginx_dirs: vec![self.dir(ServerKind::Nginx)],
            apache_dirs: vec![self.dir(ServerKind::Apache)],
            lookup_timeout: Duration::from_millis(100),
            ..Config::default()
        }
    }

    pub fn service(&self, host: ScriptedHost) -> InventoryService {
        InventoryService::new(Box::new(host), self.config())
    }
}

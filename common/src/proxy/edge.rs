use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::PathBuf;

use crate::proxy::target::Target;

/// The reverse-proxy servers whose configuration is understood.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServerKind {
    Nginx,
    Apache,
}

impl ServerKind {
    pub const ALL: [ServerKind; 2] = [ServerKind::Nginx, ServerKind::Apache];

    pub fn name(self) -> &'static str {
        match self {
            ServerKind::Nginx => "nginx",
            ServerKind::Apache => "apache",
        }
    }

    /// Process and unit names this server runs under.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            ServerKind::Nginx => &["nginx"],
            ServerKind::Apache => &["apache2", "httpd", "apache"],
        }
    }

    /// Recognises a process command or systemd unit name (`apache2.service`,
    /// `nginx`, `httpd`) as one of the known servers.
    pub fn from_service_name(name: &str) -> Option<ServerKind> {
        let base = name.strip_suffix(".service").unwrap_or(name);
        let base = base.rsplit('/').next().unwrap_or(base);
        ServerKind::ALL
            .into_iter()
            .find(|kind| kind.aliases().iter().any(|alias| base.eq_ignore_ascii_case(alias)))
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a directive was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub line: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

/// A proxy directive found in the configuration of `kind`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyEdge {
    pub kind: ServerKind,
    pub target: Target,
    pub origin: SourceLocation,
}

/// What one server kind's configuration contributed to the run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceSummary {
    pub dirs_scanned: usize,
    pub files_read: usize,
}

/// Everything extracted from the configuration files: the proxy edges in
/// file order and every served domain with the targets routed from it.
#[derive(Clone, Debug, Default)]
pub struct Inventory {
    pub edges: Vec<ProxyEdge>,
    pub domains: BTreeMap<String, BTreeSet<Target>>,
    pub sources: BTreeMap<ServerKind, SourceSummary>,
}

impl Inventory {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.domains.is_empty()
    }

    /// Links every domain of a block to every target of the same block. A
    /// block without targets still registers its domains.
    pub fn add_block(&mut self, domains: &[String], targets: &[Target]) {
        for domain in domains {
            self.domains
                .entry(domain.clone())
                .or_default()
                .extend(targets.iter().cloned());
        }
    }

    /// Appends another server kind's extraction.
    pub fn merge(&mut self, other: Inventory) {
        self.edges.extend(other.edges);
        for (domain, targets) in other.domains {
            self.domains.entry(domain).or_default().extend(targets);
        }
        self.sources.extend(other.sources);
    }

    /// Distinct targets in first-seen order.
    pub fn targets(&self) -> Vec<Target> {
        distinct(self.edges.iter())
    }

    /// Distinct targets configured in `kind`'s files, first-seen order.
    pub fn targets_of(&self, kind: ServerKind) -> Vec<Target> {
        distinct(self.edges.iter().filter(|edge| edge.kind == kind))
    }

    pub fn domains_for(&self, target: &Target) -> BTreeSet<&str> {
        self.domains
            .iter()
            .filter(|(_, targets)| targets.contains(target))
            .map(|(domain, _)| domain.as_str())
            .collect()
    }

    pub fn kinds_for(&self, target: &Target) -> BTreeSet<ServerKind> {
        self.edges
            .iter()
            .filter(|edge| &edge.target == target)
            .map(|edge| edge.kind)
            .collect()
    }

    pub fn edge_count(&self, kind: ServerKind) -> usize {
        self.edges.iter().filter(|edge| edge.kind == kind).count()
    }
}

fn distinct<'a>(edges: impl Iterator<Item = &'a ProxyEdge>) -> Vec<Target> {
    let mut seen: HashSet<&Target> = HashSet::new();
    let mut targets: Vec<Target> = Vec::new();
    for edge in edges {
        if seen.insert(&edge.target) {
            targets.push(edge.target.clone());
        }
    }
    targets
}

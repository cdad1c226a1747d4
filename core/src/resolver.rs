//! # Target Resolver
//!
//! Walks from the configured proxy targets to the processes serving them.
//!
//! Every distinct target is a seed at depth 0. When the process behind a
//! target is itself a known reverse proxy, the targets *that* proxy is
//! configured with become one hop deeper, which uncovers chains such as
//! nginx -> Apache -> application. A link past `max_depth` is not made;
//! the target it would have reached keeps its own record as a seed.
//!
//! Each target is queried at most once per run, so cyclic configurations
//! terminate.

use std::collections::{HashMap, HashSet, VecDeque};

use proxmap_common::config::Config;
use proxmap_common::inspect::{HostInspector, ProcessInfo};
use proxmap_common::proxy::edge::{Inventory, ServerKind};
use proxmap_common::proxy::resolution::{ProcessMatch, ResolutionMap, ResolutionRecord};
use proxmap_common::proxy::target::Target;
use tracing::{debug, info, warn};

/// Called with each target and its depth just before it is queried.
pub type VisitCallback = Box<dyn Fn(&Target, usize) + Send + Sync>;

struct Pending {
    target: Target,
    depth: usize,
    via: Option<Target>,
}

#[derive(Default)]
struct Hop {
    depth: usize,
    via: Option<Target>,
}

/// FIFO work list that admits each target once. The hop of a target still
/// waiting in the queue can be moved deeper when a chain reaches it.
#[derive(Default)]
struct Frontier {
    queue: VecDeque<Target>,
    waiting: HashMap<Target, Hop>,
    enqueued: HashSet<Target>,
}

impl Frontier {
    fn push(&mut self, target: Target, depth: usize, via: Option<Target>) -> bool {
        if !self.enqueued.insert(target.clone()) {
            return false;
        }
        self.waiting.insert(target.clone(), Hop { depth, via });
        self.queue.push_back(target);
        true
    }

    fn pop(&mut self) -> Option<Pending> {
        let target = self.queue.pop_front()?;
        let Hop { depth, via } = self.waiting.remove(&target).unwrap_or_default();
        Some(Pending { target, depth, via })
    }

    fn is_waiting(&self, target: &Target) -> bool {
        self.waiting.contains_key(target)
    }

    /// Records that `target` is reached from `via`, unless an earlier chain
    /// got there first.
    fn link(&mut self, target: &Target, depth: usize, via: &Target) -> bool {
        match self.waiting.get_mut(target) {
            Some(hop) if hop.via.is_none() => {
                hop.depth = depth;
                hop.via = Some(via.clone());
                true
            }
            _ => false,
        }
    }
}

pub struct TargetResolver {
    inspector: Box<dyn HostInspector>,
    max_depth: usize,
    on_visit: Option<VisitCallback>,
}

impl TargetResolver {
    pub fn new(inspector: Box<dyn HostInspector>, cfg: &Config) -> Self {
        Self {
            inspector,
            max_depth: cfg.max_depth,
            on_visit: None,
        }
    }

    pub fn on_visit(mut self, callback: VisitCallback) -> Self {
        self.on_visit = Some(callback);
        self
    }

    /// Resolves every target of `inventory`, following proxy chains up to
    /// the configured depth.
    pub async fn resolve(&self, inventory: &Inventory) -> ResolutionMap {
        let mut frontier = Frontier::default();
        for target in inventory.targets() {
            frontier.push(target, 0, None);
        }

        let chained: HashMap<ServerKind, Vec<Target>> = ServerKind::ALL
            .into_iter()
            .map(|kind| (kind, inventory.targets_of(kind)))
            .filter(|(_, targets)| !targets.is_empty())
            .collect();

        let mut units: HashMap<u32, Option<String>> = HashMap::new();
        let mut map = ResolutionMap::new();

        while let Some(Pending { target, depth, via }) = frontier.pop() {
            if map.contains(&target) {
                continue;
            }
            if let Some(callback) = &self.on_visit {
                callback(&target, depth);
            }

            let mut processes: Vec<ProcessMatch> = Vec::new();
            for ProcessInfo { pid, command } in self.processes_for(&target).await {
                let unit = match units.get(&pid) {
                    Some(unit) => unit.clone(),
                    None => {
                        let unit = self.inspector.find_systemd_unit(pid).await;
                        units.insert(pid, unit.clone());
                        unit
                    }
                };
                processes.push(ProcessMatch { pid, command, unit });
            }

            let systemd_unit = processes.iter().find_map(|p| p.unit.clone());
            let proxies_to = self.follow_chain(&target, depth, &processes, &chained, &mut frontier);

            match &systemd_unit {
                Some(unit) => debug!("{target}: {} processes under {unit}", processes.len()),
                None if processes.is_empty() => debug!("{target}: no process found"),
                None => debug!("{target}: {} processes, no unit", processes.len()),
            }

            map.insert(ResolutionRecord {
                target,
                processes,
                systemd_unit,
                depth,
                via,
                proxies_to,
            });
        }

        info!("resolved {} targets, {} unresolved", map.len(), map.unresolved_count());
        map
    }

    async fn processes_for(&self, target: &Target) -> Vec<ProcessInfo> {
        match target {
            Target::Network { host, port } => {
                let found = self.inspector.find_processes_by_port(*port).await;
                if !found.is_empty() || target.has_address_host() {
                    return found;
                }
                debug!("{target}: nothing on port {port}, trying processes named '{host}'");
                self.inspector.find_processes_by_name(host).await
            }
            Target::Socket { path } => self.inspector.find_processes_by_unix_socket(path).await,
        }
    }

    /// Returns the targets configured in whichever known proxy serves
    /// `target`. Targets still waiting are moved one hop below `target`;
    /// links deeper than the cap are dropped.
    fn follow_chain(
        &self,
        target: &Target,
        depth: usize,
        processes: &[ProcessMatch],
        chained: &HashMap<ServerKind, Vec<Target>>,
        frontier: &mut Frontier,
    ) -> Vec<Target> {
        let mut kinds: Vec<ServerKind> = Vec::new();
        for process in processes {
            let kind = process
                .unit
                .as_deref()
                .and_then(ServerKind::from_service_name)
                .or_else(|| ServerKind::from_service_name(&process.command));
            if let Some(kind) = kind
                && !kinds.contains(&kind)
            {
                kinds.push(kind);
            }
        }

        let mut proxies_to: Vec<Target> = Vec::new();
        for kind in kinds {
            let Some(next) = chained.get(&kind) else {
                continue;
            };
            for next_target in next {
                if proxies_to.contains(next_target) {
                    continue;
                }
                if depth + 1 > self.max_depth {
                    warn!("{target}: not following {next_target}, chain is deeper than {}", self.max_depth);
                    continue;
                }
                proxies_to.push(next_target.clone());

                let followed = if frontier.is_waiting(next_target) {
                    frontier.link(next_target, depth + 1, target)
                } else {
                    frontier.push(next_target.clone(), depth + 1, Some(target.clone()))
                };
                if followed {
                    debug!("{target} is served by {kind}, following {next_target}");
                }
            }
        }
        proxies_to
    }
}

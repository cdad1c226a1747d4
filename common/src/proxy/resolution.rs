use std::collections::HashMap;

use crate::proxy::target::Target;

/// A process found behind a target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessMatch {
    pub pid: u32,
    pub command: String,
    pub unit: Option<String>,
}

/// Outcome of resolving one target. Created once, never updated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionRecord {
    pub target: Target,
    /// In the order the inspector reported them.
    pub processes: Vec<ProcessMatch>,
    /// First unit found among `processes`.
    pub systemd_unit: Option<String>,
    /// Chain hops from a configured target; seeds are 0.
    pub depth: usize,
    /// Target whose backing proxy led here, if this one was reached by chaining.
    pub via: Option<Target>,
    /// Targets configured in the proxy that serves this target.
    pub proxies_to: Vec<Target>,
}

impl ResolutionRecord {
    pub fn is_resolved(&self) -> bool {
        !self.processes.is_empty()
    }
}

/// Resolution records keyed by target, kept in visit order.
#[derive(Clone, Debug, Default)]
pub struct ResolutionMap {
    records: Vec<ResolutionRecord>,
    index: HashMap<Target, usize>,
}

impl ResolutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record` unless its target already has one. Returns whether
    /// it was stored.
    pub fn insert(&mut self, record: ResolutionRecord) -> bool {
        if self.index.contains_key(&record.target) {
            return false;
        }
        self.index.insert(record.target.clone(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn contains(&self, target: &Target) -> bool {
        self.index.contains_key(target)
    }

    pub fn get(&self, target: &Target) -> Option<&ResolutionRecord> {
        self.index.get(target).map(|&idx| &self.records[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolutionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn unresolved_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_resolved()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(target: Target) -> ResolutionRecord {
        ResolutionRecord {
            target,
            processes: Vec::new(),
            systemd_unit: None,
            depth: 0,
            via: None,
            proxies_to: Vec::new(),
        }
    }

    #[test]
    fn second_record_for_target_is_refused() {
        let mut map = ResolutionMap::new();
        let t = Target::network("127.0.0.1", 80);

        assert!(map.insert(record(t.clone())));
        let mut again = record(t.clone());
        again.depth = 3;
        assert!(!map.insert(again));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&t).map(|r| r.depth), Some(0));
    }

    #[test]
    fn iteration_keeps_visit_order() {
        let mut map = ResolutionMap::new();
        let targets = [
            Target::network("b", 2),
            Target::socket("/a"),
            Target::network("a", 1),
        ];
        for t in &targets {
            map.insert(record(t.clone()));
        }

        let order: Vec<&Target> = map.iter().map(|r| &r.target).collect();
        assert_eq!(order, targets.iter().collect::<Vec<&Target>>());
        assert_eq!(map.unresolved_count(), 3);
    }
}

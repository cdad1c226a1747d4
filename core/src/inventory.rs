//! # Proxy Inventory Service
//!
//! Implements the one use case of the tool: "what is behind my reverse
//! proxies?".
//!
//! The service is split in two steps so a caller can report between them:
//! 1. [`InventoryService::extract`] reads the configuration directories.
//! 2. [`InventoryService::resolve`] asks the host who serves each target.

use proxmap_common::config::Config;
use proxmap_common::error::InventoryError;
use proxmap_common::inspect::HostInspector;
use proxmap_common::proxy::edge::Inventory;
use proxmap_common::proxy::resolution::ResolutionMap;

use crate::extract::extract_inventory;
use crate::extract::source::load_sources;
use crate::resolver::{TargetResolver, VisitCallback};

/// Application service for the proxy inventory.
///
/// Owns the run's [`Config`] and delegates host queries to whichever
/// [`HostInspector`] it was built with.
pub struct InventoryService {
    config: Config,
    resolver: TargetResolver,
}

impl InventoryService {
    pub fn new(inspector: Box<dyn HostInspector>, config: Config) -> Self {
        let resolver = TargetResolver::new(inspector, &config);
        Self { config, resolver }
    }

    /// Reports each target to `callback` as resolution reaches it.
    pub fn on_visit(mut self, callback: VisitCallback) -> Self {
        self.resolver = self.resolver.on_visit(callback);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reads every configured directory and extracts the proxy edges.
    ///
    /// Fails only when no directory of either server kind is readable.
    pub fn extract(&self) -> Result<Inventory, InventoryError> {
        let sources = load_sources(&self.config)?;
        Ok(extract_inventory(&sources))
    }

    pub async fn resolve(&self, inventory: &Inventory) -> ResolutionMap {
        self.resolver.resolve(inventory).await
    }

    /// Both steps back to back.
    pub async fn run(&self) -> Result<(Inventory, ResolutionMap), InventoryError> {
        let inventory = self.extract()?;
        let resolution = self.resolve(&inventory).await;
        Ok((inventory, resolution))
    }
}

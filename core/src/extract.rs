//! # Configuration Extraction
//!
//! Turns the files of each server kind into one [`Inventory`]:
//! * [`source`] reads the configured directories.
//! * [`nginx`] and [`apache`] understand each dialect.
//!
//! A directive that cannot be understood is logged and skipped. Extraction
//! itself never fails.

use std::path::Path;

use proxmap_common::error::DirectiveError;
use proxmap_common::proxy::edge::{Inventory, ProxyEdge, ServerKind, SourceLocation, SourceSummary};
use proxmap_common::proxy::target::Target;
use tracing::{info, warn};

pub mod apache;
pub mod nginx;
pub mod source;

use source::ConfigSource;

/// Runs the matching extractor over every source and merges the results.
pub fn extract_inventory(sources: &[ConfigSource]) -> Inventory {
    let mut inventory = Inventory::default();

    for source in sources {
        let mut part: Inventory = match source.kind {
            ServerKind::Nginx => nginx::extract(&source.files),
            ServerKind::Apache => apache::extract(&source.files),
        };
        part.sources.insert(
            source.kind,
            SourceSummary {
                dirs_scanned: source.dirs_scanned,
                files_read: source.files.len(),
            },
        );

        info!(
            "{}: {} proxy targets and {} domains in {} files",
            source.kind,
            part.targets().len(),
            part.domains.len(),
            source.files.len()
        );
        inventory.merge(part);
    }

    inventory
}

/// One `server {}` or `<VirtualHost>` stanza: the domains it serves and the
/// targets it proxies to, with the line of each directive.
#[derive(Debug, Default)]
pub(crate) struct Block {
    pub domains: Vec<String>,
    pub targets: Vec<(Target, usize)>,
}

impl Block {
    pub fn commit(self, kind: ServerKind, path: &Path, inventory: &mut Inventory) {
        let targets: Vec<Target> = self.targets.iter().map(|(t, _)| t.clone()).collect();
        inventory.add_block(&self.domains, &targets);

        for (target, line) in self.targets {
            inventory.edges.push(ProxyEdge {
                kind,
                target,
                origin: SourceLocation {
                    path: path.to_path_buf(),
                    line,
                },
            });
        }
    }
}

pub(crate) fn warn_directive(path: &Path, line: usize, err: &DirectiveError) {
    warn!("{}:{}: skipping directive: {err}", path.display(), line);
}

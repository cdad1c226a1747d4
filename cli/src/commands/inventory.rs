use std::time::{Duration, Instant};

use colored::*;
use tracing::info;

use crate::mprint;
use crate::terminal::{colors, print, spinner};
use proxmap_common::config::Config;
use proxmap_common::proxy::edge::{Inventory, ServerKind};
use proxmap_common::proxy::resolution::ResolutionMap;
use proxmap_core::inventory::InventoryService;
use proxmap_core::report;
use proxmap_core::system::SystemInspector;

pub async fn inventory(cfg: &Config) -> anyhow::Result<()> {
    let inspector = SystemInspector::new(cfg);
    let service = InventoryService::new(Box::new(inspector), cfg.clone())
        .on_visit(Box::new(spinner::report_resolution_progress));

    print::header("reading configuration", cfg.quiet);
    let inventory = service.extract()?;
    print_sources(&inventory, cfg);

    print::header("resolving targets", cfg.quiet);
    if cfg.quiet == 0 {
        spinner::start("Inspecting the host...");
    }

    let start_time: Instant = Instant::now();
    let resolution = service.resolve(&inventory).await;
    spinner::finish();

    inventory_ends(&inventory, &resolution, start_time.elapsed(), cfg);
    Ok(())
}

fn print_sources(inventory: &Inventory, cfg: &Config) {
    if cfg.quiet > 0 {
        return;
    }

    for kind in ServerKind::ALL {
        let value: ColoredString = match inventory.sources.get(&kind) {
            Some(summary) => format!(
                "{} proxy directives in {} files ({} dirs)",
                inventory.edge_count(kind),
                summary.files_read,
                summary.dirs_scanned
            )
            .color(colors::TEXT_DEFAULT),
            None => "no readable directory".color(colors::SEPARATOR),
        };
        print::aligned_line(kind.name(), value);
    }
    print::aligned_line("domains", inventory.domains.len().to_string());
}

fn inventory_ends(inventory: &Inventory, resolution: &ResolutionMap, total_time: Duration, cfg: &Config) {
    if cfg.quiet == 1 {
        mprint!();
    }

    print::header("proxy map", cfg.quiet);
    print::report(&report::render(inventory, resolution));

    if cfg.quiet < 2 {
        print_summary(resolution, total_time, cfg);
    }
}

fn print_summary(resolution: &ResolutionMap, total_time: Duration, cfg: &Config) {
    let resolved = resolution.len() - resolution.unresolved_count();
    let targets: ColoredString = format!("{resolved}/{} targets", resolution.len()).bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: &ColoredString =
        &format!("Inventory Complete: {targets} resolved in {total_time}").color(colors::TEXT_DEFAULT);

    match cfg.quiet {
        0 => {
            print::fat_separator();
            print::centerln(output);
            print::end_of_program();
        }
        _ => info!("{}", output),
    }
}

//! # Report Rendering
//!
//! Pure presentation of one run as plain text: a tree per root target, the
//! proxy chains, and every served domain. Nothing here queries the host.
//!
//! ```text
//! [1] 127.0.0.1:9000
//!  ├─ config...: nginx
//!  ├─ domains..: shop.example
//!  ├─ processes: apache2 (812)
//!  ├─ unit.....: apache2.service
//!  └─ proxies to
//!     └─ 127.0.0.1:9100
//!         ├─ config...: apache
//!         ├─ domains..: -
//!         ├─ processes: none
//!         └─ unit.....: unresolved
//! ```

use std::collections::HashSet;
use std::fmt::Write;

use proxmap_common::proxy::edge::Inventory;
use proxmap_common::proxy::resolution::{ResolutionMap, ResolutionRecord};
use proxmap_common::proxy::target::Target;

pub const NO_TARGETS: &str = "no targets found";

const KEY_WIDTH: usize = 9;

pub fn render(inventory: &Inventory, resolution: &ResolutionMap) -> String {
    let mut out = String::new();

    if resolution.is_empty() {
        out.push_str(NO_TARGETS);
        out.push('\n');
        render_domains(inventory, &mut out);
        return out;
    }

    let roots = roots(resolution);
    let mut printed: HashSet<&Target> = HashSet::new();
    let mut idx: usize = 0;

    for root in roots.iter().copied() {
        if printed.contains(&root.target) {
            continue;
        }
        idx += 1;
        render_node(
            &mut out,
            inventory,
            resolution,
            root,
            &format!("[{idx}] "),
            " ",
            &mut printed,
        );
    }

    let chains = chains(resolution, &roots);
    if !chains.is_empty() {
        out.push_str("\nchains:\n");
        for chain in chains {
            let _ = writeln!(out, "  {chain}");
        }
    }

    render_domains(inventory, &mut out);
    out
}

/// Records no other record proxies to, in resolution order, followed by
/// the rest so that fully cyclic groups are still shown.
fn roots(resolution: &ResolutionMap) -> Vec<&ResolutionRecord> {
    let children: HashSet<&Target> = resolution
        .iter()
        .flat_map(|r| r.proxies_to.iter().filter(move |t| **t != r.target))
        .collect();

    let (mut roots, rest): (Vec<&ResolutionRecord>, Vec<&ResolutionRecord>) =
        resolution.iter().partition(|r| !children.contains(&r.target));
    roots.extend(rest);
    roots
}

fn render_node<'a>(
    out: &mut String,
    inventory: &Inventory,
    resolution: &'a ResolutionMap,
    record: &'a ResolutionRecord,
    head: &str,
    body: &str,
    printed: &mut HashSet<&'a Target>,
) {
    printed.insert(&record.target);
    let _ = writeln!(out, "{head}{}", record.target);

    let fields = fields(inventory, record);
    let has_children = !record.proxies_to.is_empty();
    for (i, (key, value)) in fields.iter().enumerate() {
        let last = i + 1 == fields.len() && !has_children;
        let branch = if last { "└─" } else { "├─" };
        let dots = ".".repeat(KEY_WIDTH.saturating_sub(key.len()));
        let _ = writeln!(out, "{body}{branch} {key}{dots}: {value}");
    }

    if !has_children {
        return;
    }

    let _ = writeln!(out, "{body}└─ proxies to");
    let child_prefix = format!("{body}   ");
    for (i, child) in record.proxies_to.iter().enumerate() {
        let last = i + 1 == record.proxies_to.len();
        let child_head = format!("{child_prefix}{}", if last { "└─ " } else { "├─ " });
        let child_body = format!("{child_prefix}{}", if last { "    " } else { "│   " });

        match resolution.get(child) {
            Some(_) if printed.contains(child) => {
                let _ = writeln!(out, "{child_head}{child} (see above)");
            }
            Some(next) => render_node(out, inventory, resolution, next, &child_head, &child_body, printed),
            None => {
                let _ = writeln!(out, "{child_head}{child} (not followed)");
            }
        }
    }
}

fn fields(inventory: &Inventory, record: &ResolutionRecord) -> Vec<(&'static str, String)> {
    let kinds: Vec<&str> = inventory.kinds_for(&record.target).into_iter().map(|k| k.name()).collect();
    let domains: Vec<&str> = inventory.domains_for(&record.target).into_iter().collect();
    let processes: Vec<String> = record
        .processes
        .iter()
        .map(|p| format!("{} ({})", p.command, p.pid))
        .collect();

    vec![
        ("config", or_placeholder(kinds.join(", "), "-")),
        ("domains", or_placeholder(domains.join(", "), "-")),
        ("processes", or_placeholder(processes.join(", "), "none")),
        ("unit", unit_label(record).to_string()),
    ]
}

fn or_placeholder(value: String, placeholder: &str) -> String {
    if value.is_empty() { placeholder.to_string() } else { value }
}

fn unit_label(record: &ResolutionRecord) -> &str {
    match (&record.systemd_unit, record.processes.is_empty()) {
        (Some(unit), _) => unit.as_str(),
        (None, true) => "unresolved",
        (None, false) => "unmanaged",
    }
}

/// Short name of what serves a target, for chain lines.
fn serving_label(record: &ResolutionRecord) -> &str {
    match (&record.systemd_unit, record.processes.first()) {
        (Some(unit), _) => unit.as_str(),
        (None, Some(process)) => process.command.as_str(),
        (None, None) => "unresolved",
    }
}

/// Chains of at least one hop, starting from each root. A target is expanded
/// once per report; a later path that reaches it again ends there, so the
/// listing has at most one line per `proxies_to` link.
fn chains(resolution: &ResolutionMap, roots: &[&ResolutionRecord]) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut expanded: HashSet<&Target> = HashSet::new();

    for root in roots.iter().copied() {
        if root.proxies_to.is_empty() || expanded.contains(&root.target) {
            continue;
        }
        let mut path: Vec<&ResolutionRecord> = vec![root];
        walk(resolution, &mut path, &mut expanded, &mut lines);
    }
    lines
}

fn walk<'a>(
    resolution: &'a ResolutionMap,
    path: &mut Vec<&'a ResolutionRecord>,
    expanded: &mut HashSet<&'a Target>,
    lines: &mut Vec<String>,
) {
    let Some(last) = path.last().copied() else {
        return;
    };
    expanded.insert(&last.target);

    let next: Vec<&ResolutionRecord> = last
        .proxies_to
        .iter()
        .filter_map(|t| resolution.get(t))
        .collect();

    if next.is_empty() {
        if path.len() > 1 {
            lines.push(chain_line(path, None));
        }
        return;
    }

    for child in next {
        if path.iter().any(|r| r.target == child.target) {
            lines.push(chain_line(path, Some((child, "cycle"))));
        } else if expanded.contains(&child.target) && !child.proxies_to.is_empty() {
            lines.push(chain_line(path, Some((child, "see above"))));
        } else {
            path.push(child);
            walk(resolution, path, expanded, lines);
            path.pop();
        }
    }
}

fn chain_line(path: &[&ResolutionRecord], end: Option<(&ResolutionRecord, &str)>) -> String {
    let mut hops: Vec<String> = path
        .iter()
        .map(|r| format!("{} ({})", r.target, serving_label(r)))
        .collect();
    if let Some((back, note)) = end {
        hops.push(format!("{} ({note})", back.target));
    }
    hops.join(" -> ")
}

fn render_domains(inventory: &Inventory, out: &mut String) {
    if inventory.domains.is_empty() {
        return;
    }
    out.push_str("\nserved domains:\n");
    for (domain, targets) in &inventory.domains {
        let targets: Vec<String> = targets.iter().map(Target::to_string).collect();
        let _ = writeln!(out, "  {domain} -> {}", or_placeholder(targets.join(", "), "-"));
    }
}

//! Apache httpd configuration extraction.
//!
//! Apache configuration is line oriented: physical lines ending in `\` are
//! joined, comments are dropped, and `<VirtualHost>` sections delimit the
//! blocks that link `ServerName`/`ServerAlias` to proxy directives.

use std::path::Path;

use proxmap_common::error::DirectiveError;
use proxmap_common::proxy::edge::{Inventory, ServerKind};
use proxmap_common::proxy::target::Target;
use tracing::warn;

use crate::extract::source::ConfigFile;
use crate::extract::{Block, warn_directive};

/// A directive after comment stripping and continuation joining.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    number: usize,
    tokens: Vec<String>,
}

pub fn extract(files: &[ConfigFile]) -> Inventory {
    let mut inventory = Inventory::default();

    for file in files {
        let mut loose = Block::default();
        let mut vhost: Option<Block> = None;

        for line in logical_lines(&file.contents) {
            let Some(head) = line.tokens.first() else { continue };

            if head.starts_with('<') {
                let section = head.trim_start_matches('<').trim_end_matches('>');
                if section.eq_ignore_ascii_case("VirtualHost") {
                    if let Some(open) = vhost.take() {
                        warn!("{}:{}: <VirtualHost> opened inside another", file.path.display(), line.number);
                        open.commit(ServerKind::Apache, &file.path, &mut inventory);
                    }
                    vhost = Some(Block::default());
                } else if section.eq_ignore_ascii_case("/VirtualHost") {
                    match vhost.take() {
                        Some(block) => block.commit(ServerKind::Apache, &file.path, &mut inventory),
                        None => warn!("{}:{}: unbalanced </VirtualHost>", file.path.display(), line.number),
                    }
                }
                continue;
            }

            let block = vhost.as_mut().unwrap_or(&mut loose);
            apply_directive(&line, &file.path, block);
        }

        if let Some(open) = vhost {
            warn!("{}: <VirtualHost> is never closed", file.path.display());
            open.commit(ServerKind::Apache, &file.path, &mut inventory);
        }

        // Server-wide names are served domains, but are not linked to
        // server-wide proxy directives.
        inventory.add_block(&loose.domains, &[]);
        Block {
            domains: Vec::new(),
            targets: loose.targets,
        }
        .commit(ServerKind::Apache, &file.path, &mut inventory);
    }

    inventory
}

fn apply_directive(line: &Line, path: &Path, block: &mut Block) {
    let directive = line.tokens[0].as_str();
    let args = &line.tokens[1..];

    if directive.eq_ignore_ascii_case("ServerName") {
        match args.first() {
            Some(name) => block.domains.push(domain_name(name)),
            None => warn_directive(path, line.number, &missing(directive)),
        }
    } else if directive.eq_ignore_ascii_case("ServerAlias") {
        if args.is_empty() {
            warn_directive(path, line.number, &missing(directive));
        }
        block.domains.extend(args.iter().map(|name| domain_name(name)));
    } else if directive.eq_ignore_ascii_case("ProxyPass") || directive.eq_ignore_ascii_case("ProxyPassMatch") {
        let Some(url) = proxy_pass_url(args) else {
            if args.is_empty() {
                warn_directive(path, line.number, &missing(directive));
            }
            return;
        };
        push_target(url, directive, line.number, path, block);
    } else if directive.eq_ignore_ascii_case("SetHandler") {
        let handler = args.first().map(String::as_str).unwrap_or_default();
        if let Some(url) = handler.get(..6).filter(|p| p.eq_ignore_ascii_case("proxy:")).map(|_| &handler[6..]) {
            push_target(url, directive, line.number, path, block);
        }
    }
}

/// Picks the backend URL out of `ProxyPass [path] url [key=value ...]`.
/// Returns `None` for `!` exclusions and argument-less directives.
fn proxy_pass_url(args: &[String]) -> Option<&str> {
    let first = args.first()?;
    if looks_like_url(first) {
        return Some(first);
    }
    match args.get(1).map(String::as_str) {
        Some("!") | None => None,
        Some(url) => Some(url),
    }
}

fn looks_like_url(arg: &str) -> bool {
    arg.contains("://") || arg.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("unix:"))
}

fn push_target(url: &str, directive: &str, number: usize, path: &Path, block: &mut Block) {
    match Target::from_url(url) {
        Ok(target) => block.targets.push((target, number)),
        Err(source) => warn_directive(
            path,
            number,
            &DirectiveError::InvalidTarget {
                directive: directive.to_string(),
                source,
            },
        ),
    }
}

/// `ServerName` may carry a scheme and a port; only the host is a domain.
fn domain_name(raw: &str) -> String {
    let name = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    let name = match name.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => name,
    };
    name.to_ascii_lowercase()
}

fn missing(directive: &str) -> DirectiveError {
    DirectiveError::MissingArgument {
        directive: directive.to_string(),
    }
}

fn logical_lines(src: &str) -> Vec<Line> {
    let mut lines: Vec<Line> = Vec::new();
    let mut pending = String::new();
    let mut start: usize = 0;

    for (idx, raw) in src.lines().enumerate() {
        if pending.is_empty() {
            start = idx + 1;
            if raw.trim_start().starts_with('#') {
                continue;
            }
        }

        let trimmed = raw.trim_end();
        match trimmed.strip_suffix('\\') {
            Some(head) => {
                pending.push_str(head);
                pending.push(' ');
            }
            None => {
                pending.push_str(trimmed);
                let tokens = tokenize(&pending);
                if !tokens.is_empty() {
                    lines.push(Line { number: start, tokens });
                }
                pending.clear();
            }
        }
    }

    if !pending.is_empty() {
        let tokens = tokenize(&pending);
        if !tokens.is_empty() {
            lines.push(Line { number: start, tokens });
        }
    }
    lines
}

/// Whitespace separated tokens, double quotes grouping. Stops at the first
/// token starting with `#`.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '#' {
            break;
        }

        let mut token = String::new();
        let mut quoted = false;
        while let Some(&next) = chars.peek() {
            if next == '"' {
                quoted = !quoted;
            } else if next.is_whitespace() && !quoted {
                break;
            } else {
                token.push(next);
            }
            chars.next();
        }
        tokens.push(token);
    }
    tokens
}

//! Nginx configuration extraction.
//!
//! The files are lexed into statements and blocks, `upstream` groups are
//! collected across all files, then every `server {}` block contributes its
//! `server_name` domains and the targets of its `*_pass` directives.

use std::collections::HashMap;
use std::iter::Peekable;
use std::path::Path;
use std::vec::IntoIter;

use proxmap_common::error::DirectiveError;
use proxmap_common::proxy::edge::{Inventory, ServerKind};
use proxmap_common::proxy::target::Target;
use tracing::warn;

use crate::extract::source::ConfigFile;
use crate::extract::{Block, warn_directive};

/// Directives whose argument is a proxied backend.
const PASS_DIRECTIVES: &[&str] = &["proxy_pass", "fastcgi_pass", "uwsgi_pass", "scgi_pass", "grpc_pass"];
const UPSTREAM_DEFAULT_PORT: u16 = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Semicolon,
    Open,
    Close,
}

#[derive(Debug, Clone)]
struct Lexeme {
    token: Token,
    line: usize,
}

/// `name args... ;` or `name args... { children }`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Statement {
    name: String,
    args: Vec<String>,
    line: usize,
    block: Option<Vec<Statement>>,
}

pub fn extract(files: &[ConfigFile]) -> Inventory {
    let parsed: Vec<(&ConfigFile, Vec<Statement>)> = files
        .iter()
        .map(|file| (file, parse(&file.contents, &file.path)))
        .collect();

    let mut upstreams: HashMap<String, Vec<Target>> = HashMap::new();
    for (file, statements) in &parsed {
        collect_upstreams(statements, &file.path, &mut upstreams);
    }

    let mut inventory = Inventory::default();
    for (file, statements) in &parsed {
        let mut blocks: Vec<Block> = Vec::new();
        let mut loose = Block::default();
        collect_blocks(statements, &file.path, &upstreams, &mut blocks, &mut loose);
        blocks.push(loose);

        for block in blocks {
            block.commit(ServerKind::Nginx, &file.path, &mut inventory);
        }
    }
    inventory
}

fn collect_upstreams(statements: &[Statement], path: &Path, upstreams: &mut HashMap<String, Vec<Target>>) {
    for stmt in statements {
        let Some(children) = &stmt.block else { continue };

        if stmt.name != "upstream" {
            collect_upstreams(children, path, upstreams);
            continue;
        }

        let Some(name) = stmt.args.first() else {
            warn_directive(path, stmt.line, &missing("upstream"));
            continue;
        };

        let servers = upstreams.entry(name.clone()).or_default();
        for entry in children.iter().filter(|s| s.name == "server") {
            let Some(addr) = entry.args.first() else {
                warn_directive(path, entry.line, &missing("server"));
                continue;
            };
            match Target::from_address(addr, Some(UPSTREAM_DEFAULT_PORT)) {
                Ok(target) => servers.push(target),
                Err(source) => warn_directive(
                    path,
                    entry.line,
                    &DirectiveError::InvalidTarget {
                        directive: "server".into(),
                        source,
                    },
                ),
            }
        }
    }
}

fn collect_blocks(
    statements: &[Statement],
    path: &Path,
    upstreams: &HashMap<String, Vec<Target>>,
    blocks: &mut Vec<Block>,
    current: &mut Block,
) {
    for stmt in statements {
        match (stmt.name.as_str(), &stmt.block) {
            ("upstream", Some(_)) => {}
            ("server", Some(children)) => {
                let mut block = Block::default();
                collect_blocks(children, path, upstreams, blocks, &mut block);
                blocks.push(block);
            }
            ("server_name", None) => {
                current.domains.extend(
                    stmt.args
                        .iter()
                        .filter(|name| !name.is_empty() && name.as_str() != "_")
                        .cloned(),
                );
            }
            (name, None) if PASS_DIRECTIVES.contains(&name) => {
                pass_targets(stmt, path, upstreams, current);
            }
            (_, Some(children)) => collect_blocks(children, path, upstreams, blocks, current),
            _ => {}
        }
    }
}

fn pass_targets(stmt: &Statement, path: &Path, upstreams: &HashMap<String, Vec<Target>>, block: &mut Block) {
    let Some(url) = stmt.args.first() else {
        warn_directive(path, stmt.line, &missing(&stmt.name));
        return;
    };

    if let Some(servers) = upstreams.get(upstream_reference(url)) {
        if servers.is_empty() {
            warn!("{}:{}: upstream '{}' has no servers", path.display(), stmt.line, upstream_reference(url));
        }
        for target in servers {
            block.targets.push((target.clone(), stmt.line));
        }
        return;
    }

    match Target::from_url(url) {
        Ok(target) => block.targets.push((target, stmt.line)),
        Err(source) => warn_directive(
            path,
            stmt.line,
            &DirectiveError::InvalidTarget {
                directive: stmt.name.clone(),
                source,
            },
        ),
    }
}

/// The authority part of `scheme://name/uri`, which may name an upstream group.
fn upstream_reference(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split('/').next().unwrap_or(rest)
}

fn missing(directive: &str) -> DirectiveError {
    DirectiveError::MissingArgument {
        directive: directive.to_string(),
    }
}

fn parse(src: &str, path: &Path) -> Vec<Statement> {
    let mut lexemes = tokenize(src).into_iter().peekable();
    parse_block(&mut lexemes, path, 0)
}

fn parse_block(lexemes: &mut Peekable<IntoIter<Lexeme>>, path: &Path, depth: usize) -> Vec<Statement> {
    let mut statements: Vec<Statement> = Vec::new();

    while let Some(lexeme) = lexemes.next() {
        match lexeme.token {
            Token::Word(name) => {
                statements.push(parse_statement(name, lexeme.line, lexemes, path, depth));
            }
            Token::Semicolon => {}
            Token::Open => {
                warn!("{}:{}: block without a directive name", path.display(), lexeme.line);
                statements.extend(parse_block(lexemes, path, depth + 1));
            }
            Token::Close => {
                if depth > 0 {
                    return statements;
                }
                warn!("{}:{}: unbalanced '}}'", path.display(), lexeme.line);
            }
        }
    }

    if depth > 0 {
        warn!("{}: unterminated block at end of file", path.display());
    }
    statements
}

/// Reads arguments up to `;` or a `{ ... }` block. A `}` is left for the
/// enclosing block to consume.
fn parse_statement(
    name: String,
    line: usize,
    lexemes: &mut Peekable<IntoIter<Lexeme>>,
    path: &Path,
    depth: usize,
) -> Statement {
    let mut stmt = Statement {
        name,
        args: Vec::new(),
        line,
        block: None,
    };

    while let Some(lexeme) = lexemes.next_if(|l| l.token != Token::Close) {
        match lexeme.token {
            Token::Word(arg) => stmt.args.push(arg),
            Token::Semicolon | Token::Close => return stmt,
            Token::Open => {
                stmt.block = Some(parse_block(lexemes, path, depth + 1));
                return stmt;
            }
        }
    }

    warn!("{}:{}: '{}' is missing its ';'", path.display(), stmt.line, stmt.name);
    stmt
}

fn tokenize(src: &str) -> Vec<Lexeme> {
    let mut lexemes: Vec<Lexeme> = Vec::new();
    let mut chars = src.chars().peekable();
    let mut line: usize = 1;

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '#' => {
                while chars.peek().is_some_and(|&next| next != '\n') {
                    chars.next();
                }
            }
            ';' => lexemes.push(Lexeme { token: Token::Semicolon, line }),
            '{' => lexemes.push(Lexeme { token: Token::Open, line }),
            '}' => lexemes.push(Lexeme { token: Token::Close, line }),
            '"' | '\'' => {
                let start = line;
                let mut word = String::new();
                while let Some(next) = chars.next() {
                    match next {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                word.push(escaped);
                            }
                        }
                        q if q == c => break,
                        '\n' => {
                            line += 1;
                            word.push(next);
                        }
                        _ => word.push(next),
                    }
                }
                lexemes.push(Lexeme { token: Token::Word(word), line: start });
            }
            _ => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || matches!(next, ';' | '{' | '}') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                lexemes.push(Lexeme { token: Token::Word(word), line });
            }
        }
    }
    lexemes
}

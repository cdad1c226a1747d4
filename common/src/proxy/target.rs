//! # Proxy Target Model
//!
//! A target is the destination a reverse-proxy directive forwards to:
//! * A network endpoint (`127.0.0.1:8080`, `backend.internal:443`).
//! * A UNIX domain socket (`unix:/run/php/php-fpm.sock`).
//!
//! Parsing understands the URL shapes used by `proxy_pass`, `fastcgi_pass`,
//! `ProxyPass` and `SetHandler "proxy:..."`.

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TargetParseError;

/// A proxy destination. Identity is structural.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    Network { host: String, port: u16 },
    Socket { path: PathBuf },
}

impl Target {
    pub fn network(host: impl Into<String>, port: u16) -> Self {
        Target::Network {
            host: host.into(),
            port,
        }
    }

    pub fn socket(path: impl Into<PathBuf>) -> Self {
        Target::Socket { path: path.into() }
    }

    /// Parses a proxy URL: `scheme://host[:port][/path]`, `unix:<path>`,
    /// `unix:<path>|<url>`, `http://unix:<path>:<uri>` or a bare `host:port`.
    ///
    /// A missing port falls back to the scheme default (see [`default_port`]).
    pub fn from_url(raw: &str) -> Result<Target, TargetParseError> {
        let s = unquote(raw.trim());
        if s.is_empty() {
            return Err(TargetParseError::Empty);
        }

        if let Some(rest) = strip_prefix_ignore_case(s, "unix:") {
            return parse_socket(rest, s);
        }

        let Some((scheme, rest)) = s.split_once("://") else {
            return Target::from_address(s, None);
        };

        let scheme = scheme.to_ascii_lowercase();
        if scheme == "balancer" {
            return Err(TargetParseError::UnsupportedScheme {
                scheme,
                raw: s.to_string(),
            });
        }

        // nginx: proxy_pass http://unix:/tmp/app.sock:/uri
        if let Some(socket) = strip_prefix_ignore_case(rest, "unix:") {
            let path = socket.split(':').next().unwrap_or_default();
            return parse_socket(path, s);
        }

        // Variables may follow the authority (`$request_uri`), never replace it.
        if rest.starts_with('$') {
            return Err(TargetParseError::Variable(s.to_string()));
        }
        let authority = rest.split(['/', '?', '#', '$']).next().unwrap_or_default();
        let authority = authority.rsplit('@').next().unwrap_or_default();
        parse_authority(authority, default_port(&scheme), s)
    }

    /// Parses `host[:port]` or `unix:<path>`, as found in `fastcgi_pass`
    /// arguments and `upstream { server ...; }` entries.
    pub fn from_address(raw: &str, default_port: Option<u16>) -> Result<Target, TargetParseError> {
        let s = unquote(raw.trim());
        if s.is_empty() {
            return Err(TargetParseError::Empty);
        }
        if s.contains('$') {
            return Err(TargetParseError::Variable(s.to_string()));
        }
        if let Some(rest) = strip_prefix_ignore_case(s, "unix:") {
            return parse_socket(rest, s);
        }
        parse_authority(s, default_port, s)
    }

    pub fn host(&self) -> Option<&str> {
        match self {
            Target::Network { host, .. } => Some(host),
            Target::Socket { .. } => None,
        }
    }

    /// True when the host part is an IP literal or `localhost`, i.e. carries
    /// no process-name hint.
    pub fn has_address_host(&self) -> bool {
        match self {
            Target::Network { host, .. } => {
                host.eq_ignore_ascii_case("localhost") || host.parse::<IpAddr>().is_ok()
            }
            Target::Socket { .. } => false,
        }
    }
}

impl FromStr for Target {
    type Err = TargetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::from_url(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Network { host, port } if host.contains(':') => write!(f, "[{host}]:{port}"),
            Target::Network { host, port } => write!(f, "{host}:{port}"),
            Target::Socket { path } => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Port implied by a URL scheme when none is written.
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" | "grpc" => Some(80),
        "https" | "wss" | "grpcs" => Some(443),
        "ajp" => Some(8009),
        _ => None,
    }
}

fn unquote(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '\'')
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// `rest` is everything after `unix:`; Apache appends `|<url>` to it.
fn parse_socket(rest: &str, raw: &str) -> Result<Target, TargetParseError> {
    let path = rest.split('|').next().unwrap_or_default().trim();
    if path.is_empty() {
        return Err(TargetParseError::MissingSocketPath(raw.to_string()));
    }
    Ok(Target::socket(path))
}

fn parse_authority(
    authority: &str,
    default_port: Option<u16>,
    raw: &str,
) -> Result<Target, TargetParseError> {
    let (host, port) = split_host_port(authority);
    if host.is_empty() {
        return Err(TargetParseError::MissingHost(raw.to_string()));
    }

    let port = match port {
        Some(p) => p.parse::<u16>().map_err(|_| TargetParseError::InvalidPort {
            port: p.to_string(),
            raw: raw.to_string(),
        })?,
        None => default_port.ok_or_else(|| TargetParseError::MissingPort(raw.to_string()))?,
    };

    Ok(Target::network(host.to_ascii_lowercase(), port))
}

/// Splits `host:port`, `[v6]:port`, `[v6]` or `host`.
fn split_host_port(authority: &str) -> (&str, Option<&str>) {
    if let Some(rest) = authority.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((host, tail)) => (host, tail.strip_prefix(':')),
            None => (rest, None),
        };
    }
    match authority.rsplit_once(':') {
        // A bare IPv6 literal without brackets has several colons.
        Some(_) if authority.matches(':').count() > 1 => (authority, None),
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    }
}

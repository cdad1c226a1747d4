pub mod inventory;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use proxmap_common::config::{Config, DEFAULT_LOOKUP_TIMEOUT, DEFAULT_MAX_DEPTH};
use tracing::Level;

#[derive(Parser)]
#[command(name = "proxmap", version)]
#[command(about = "Maps reverse-proxy configuration to the processes serving it.")]
pub struct CommandLine {
    /// Nginx configuration directory (repeatable, replaces the defaults)
    #[arg(long = "nginx-dir", value_name = "DIR")]
    pub nginx_dirs: Vec<PathBuf>,

    /// Apache configuration directory (repeatable, replaces the defaults)
    #[arg(long = "apache-dir", value_name = "DIR")]
    pub apache_dirs: Vec<PathBuf>,

    /// How many proxy hops to follow
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Time allowed for each external lookup
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_LOOKUP_TIMEOUT.as_millis() as u64)]
    pub timeout_ms: u64,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Less output (-q hides progress, -qq prints only the report)
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,

    /// Log level, overrides -v/-q and RUST_LOG
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Skip the banner
    #[arg(long)]
    pub no_banner: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Level implied by `-v`/`-q` when neither `--log-level` nor `RUST_LOG`
    /// is given.
    pub fn verbosity_level(&self) -> Level {
        match (self.verbose, self.quiet) {
            (0, 0) => Level::INFO,
            (1, _) => Level::DEBUG,
            (2.., _) => Level::TRACE,
            (0, 1) => Level::WARN,
            (0, _) => Level::ERROR,
        }
    }

    pub fn to_config(&self) -> Config {
        let defaults = Config::default();
        Config {
            nginx_dirs: if self.nginx_dirs.is_empty() { defaults.nginx_dirs } else { self.nginx_dirs.clone() },
            apache_dirs: if self.apache_dirs.is_empty() { defaults.apache_dirs } else { self.apache_dirs.clone() },
            max_depth: self.max_depth,
            lookup_timeout: Duration::from_millis(self.timeout_ms),
            quiet: self.quiet,
            no_banner: self.no_banner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_gives_defaults() {
        let cli = CommandLine::try_parse_from(["proxmap"]).unwrap();
        let cfg = cli.to_config();
        assert_eq!(cfg.nginx_dirs, Config::default().nginx_dirs);
        assert_eq!(cfg.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(cfg.lookup_timeout, DEFAULT_LOOKUP_TIMEOUT);
        assert_eq!(cli.verbosity_level(), Level::INFO);
    }

    #[test]
    fn test_directories_replace_defaults() {
        let cli = CommandLine::try_parse_from([
            "proxmap",
            "--nginx-dir",
            "/srv/nginx",
            "--nginx-dir",
            "/srv/nginx2",
            "--timeout-ms",
            "250",
        ])
        .unwrap();
        let cfg = cli.to_config();
        assert_eq!(cfg.nginx_dirs, vec![PathBuf::from("/srv/nginx"), PathBuf::from("/srv/nginx2")]);
        assert_eq!(cfg.apache_dirs, Config::default().apache_dirs);
        assert_eq!(cfg.lookup_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_verbosity_flags() {
        let level = |args: &[&str]| CommandLine::try_parse_from(args).unwrap().verbosity_level();
        assert_eq!(level(&["proxmap", "-v"]), Level::DEBUG);
        assert_eq!(level(&["proxmap", "-vv"]), Level::TRACE);
        assert_eq!(level(&["proxmap", "-q"]), Level::WARN);
        assert_eq!(level(&["proxmap", "-qq"]), Level::ERROR);
        assert!(CommandLine::try_parse_from(["proxmap", "-v", "-q"]).is_err());
    }
}

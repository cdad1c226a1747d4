use std::path::PathBuf;
use std::time::Duration;

use crate::proxy::edge::ServerKind;

pub const DEFAULT_NGINX_DIRS: &[&str] = &["/etc/nginx/sites-enabled", "/etc/nginx/conf.d"];
pub const DEFAULT_APACHE_DIRS: &[&str] = &["/etc/apache2/sites-enabled", "/etc/apache2/conf-enabled"];
pub const DEFAULT_MAX_DEPTH: usize = 8;
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Settings for one inventory run.
///
/// Built once by the binary and handed to the loader, the resolver and the
/// system adapter at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directories scanned for Nginx site/config files.
    pub nginx_dirs: Vec<PathBuf>,
    /// Directories scanned for Apache site/config files.
    pub apache_dirs: Vec<PathBuf>,
    /// Deepest chain hop the resolver will enqueue.
    pub max_depth: usize,
    /// Upper bound for every external inspection utility.
    pub lookup_timeout: Duration,
    /// 0 prints everything, 1 drops decoration, 2 prints only the report.
    pub quiet: u8,
    pub no_banner: bool,
}

impl Config {
    pub fn dirs_for(&self, kind: ServerKind) -> &[PathBuf] {
        match kind {
            ServerKind::Nginx => &self.nginx_dirs,
            ServerKind::Apache => &self.apache_dirs,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nginx_dirs: DEFAULT_NGINX_DIRS.iter().map(PathBuf::from).collect(),
            apache_dirs: DEFAULT_APACHE_DIRS.iter().map(PathBuf::from).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            quiet: 0,
            no_banner: false,
        }
    }
}

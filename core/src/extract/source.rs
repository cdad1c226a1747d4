use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use proxmap_common::config::Config;
use proxmap_common::error::InventoryError;
use proxmap_common::proxy::edge::ServerKind;
use tracing::{debug, warn};

/// One configuration file, read into memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub contents: String,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// The files of one server kind that could be read.
#[derive(Clone, Debug)]
pub struct ConfigSource {
    pub kind: ServerKind,
    pub dirs_scanned: usize,
    pub files: Vec<ConfigFile>,
}

/// Reads every configured directory of every server kind.
///
/// Missing directories and unreadable files are skipped with a warning. The
/// call fails only when not a single directory of either kind is accessible.
pub fn load_sources(cfg: &Config) -> Result<Vec<ConfigSource>, InventoryError> {
    let mut sources: Vec<ConfigSource> = Vec::new();
    let mut searched: Vec<PathBuf> = Vec::new();

    for kind in ServerKind::ALL {
        let mut source = ConfigSource {
            kind,
            dirs_scanned: 0,
            files: Vec::new(),
        };

        for dir in cfg.dirs_for(kind) {
            searched.push(dir.clone());
            match read_dir_files(dir) {
                Ok(files) => {
                    debug!("{} files in {}", files.len(), dir.display());
                    source.dirs_scanned += 1;
                    source.files.extend(files);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!("{kind} directory {} does not exist, skipping", dir.display());
                }
                Err(e) => {
                    warn!("cannot read {kind} directory {}: {e}", dir.display());
                }
            }
        }

        if source.dirs_scanned > 0 {
            sources.push(source);
        }
    }

    if sources.is_empty() {
        return Err(InventoryError::NoConfigAccessible { searched });
    }
    Ok(sources)
}

fn read_dir_files(dir: &Path) -> std::io::Result<Vec<ConfigFile>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| !is_hidden(path))
        // metadata() follows the symlinks sites-enabled is made of
        .filter(|path| fs::metadata(path).map(|m| m.is_file()).unwrap_or(false))
        .collect();
    paths.sort();

    let mut files: Vec<ConfigFile> = Vec::with_capacity(paths.len());
    for path in paths {
        match fs::read_to_string(&path) {
            Ok(contents) => files.push(ConfigFile { path, contents }),
            Err(e) => warn!("cannot read {}: {e}", path.display()),
        }
    }
    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

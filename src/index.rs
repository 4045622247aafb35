//! In-memory index of servable paths, maintained from filesystem watch events.
//!
//! Membership is derived exclusively from real directory enumeration: request
//! paths are only ever looked up, never inserted, so a request can only
//! succeed if it exactly matches a previously enumerated file. That is what
//! makes the server traversal-proof by construction.

use crate::error::{Result, ServeError};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use walkdir::WalkDir;

/// Set of normalized absolute URL paths currently present on disk.
///
/// Paths always start with `/` and use `/` separators regardless of the host
/// filesystem. With a configured prefix every entry is namespaced under
/// `/<prefix>/...`.
pub struct FileIndex {
    paths: RwLock<HashSet<String>>,
    root: PathBuf,
    prefix: Option<String>,
}

/// Shared handle for passing the index around.
pub type SharedIndex = Arc<FileIndex>;

impl FileIndex {
    /// Create an empty index rooted at `root`.
    pub fn new(root: PathBuf, prefix: Option<String>) -> Self {
        Self {
            paths: RwLock::new(HashSet::new()),
            root,
            prefix,
        }
    }

    /// Populate the index with every file under the serving root.
    ///
    /// Runs once at startup, before the listener binds. Unreadable entries
    /// are skipped rather than fatal.
    pub fn scan(&self) -> Result<usize> {
        let mut paths = self.paths.write();
        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if let Some(url_path) = self.url_path_for(entry.path()) {
                paths.insert(url_path);
            }
        }
        Ok(paths.len())
    }

    /// Insert a served path.
    pub fn insert(&self, url_path: String) {
        self.paths.write().insert(url_path);
    }

    /// Remove a served path.
    pub fn remove(&self, url_path: &str) {
        self.paths.write().remove(url_path);
    }

    /// Whether the exact URL path corresponds to a real indexed file.
    pub fn contains(&self, url_path: &str) -> bool {
        self.paths.read().contains(url_path)
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.paths.read().len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.paths.read().is_empty()
    }

    /// Consistent snapshot of every indexed path (for directory listings).
    pub fn snapshot(&self) -> Vec<String> {
        self.paths.read().iter().cloned().collect()
    }

    /// Map a filesystem path under the serving root to its URL path.
    ///
    /// Returns None for paths outside the root. Separators are normalized to
    /// the URL form and the configured prefix is prepended.
    pub fn url_path_for(&self, fs_path: &Path) -> Option<String> {
        let rel = fs_path.strip_prefix(&self.root).ok()?;
        let mut url = String::new();
        if let Some(prefix) = &self.prefix {
            url.push('/');
            url.push_str(prefix);
        }
        for component in rel.components() {
            url.push('/');
            url.push_str(&component.as_os_str().to_string_lossy());
        }
        if url.is_empty() { None } else { Some(url) }
    }

    /// Map an indexed URL path back to its filesystem path, stripping the
    /// configured prefix.
    ///
    /// Only meaningful for paths that passed [`FileIndex::contains`]; the
    /// result is a join of enumerated components, never of user input.
    pub fn fs_path_for(&self, url_path: &str) -> Option<PathBuf> {
        let rel = match &self.prefix {
            Some(prefix) => url_path
                .strip_prefix(&format!("/{prefix}/"))
                .map(str::to_string)?,
            None => url_path.strip_prefix('/')?.to_string(),
        };
        let mut fs_path = self.root.clone();
        for segment in rel.split('/') {
            fs_path.push(segment);
        }
        Some(fs_path)
    }
}

/// File change event delivered by the watcher.
#[derive(Debug, Clone)]
pub enum FileChange {
    /// File appeared on disk
    Created(PathBuf),
    /// File contents changed
    Modified(PathBuf),
    /// File was removed
    Removed(PathBuf),
}

impl FileChange {
    /// The path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Created(p) | FileChange::Modified(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Recursive filesystem watcher feeding [`FileChange`] events to a channel.
///
/// Events for a single path arrive in delivery order; that is the only
/// ordering guarantee the index relies on.
pub struct IndexWatcher {
    /// Underlying notify watcher, kept alive for the watch duration
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl IndexWatcher {
    /// Start watching `root` recursively.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher cannot be created or the directory
    /// doesn't exist.
    pub fn new(root: PathBuf) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(ServeError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                for path in &event.paths {
                    let change = match event.kind {
                        notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                        notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                        notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                        _ => continue,
                    };
                    let _ = tx.blocking_send(change);
                }
            }
        })
        .map_err(ServeError::Watch)?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(ServeError::Watch)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// The root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

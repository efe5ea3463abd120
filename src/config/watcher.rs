//! Config file watcher for live gate reloads.
//!
//! Editors save either by writing the file in place or by writing a sibling
//! temp file and renaming it over the original. A watch on the file itself
//! stays bound to the replaced inode after a rename, so the watcher follows
//! the containing directory and picks out events for the config file by name.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::DevGateConfig;

/// Reloads the config file on change and sends each new valid config.
pub struct ConfigWatcher {
    path: PathBuf,
    file_name: Option<OsString>,
    last_sent: Option<DevGateConfig>,
    update_tx: mpsc::UnboundedSender<DevGateConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for reloaded configs.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<DevGateConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                file_name: path.file_name().map(OsString::from),
                last_sent: None,
                update_tx,
            },
            update_rx,
        )
    }

    /// Treat `config` as already applied, so saving the file unchanged
    /// sends nothing.
    pub fn starting_from(mut self, config: DevGateConfig) -> Self {
        self.last_sent = Some(config);
        self
    }

    /// Start watching on notify's background thread.
    ///
    /// The returned watcher must be kept alive for as long as updates are wanted.
    pub fn run(mut self) -> Result<RecommendedWatcher, notify::Error> {
        if self.file_name.is_none() {
            return Err(notify::Error::generic("config path does not name a file"));
        }
        let path = self.path.clone();
        let directory = watch_directory(&path);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| self.on_event(res),
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, directory = ?directory, "Config watcher started");
        Ok(watcher)
    }

    fn on_event(&mut self, res: notify::Result<Event>) {
        match res {
            Ok(event) if self.concerns(&event) => self.reload(),
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Config watch error"),
        }
    }

    /// A create or modify (including rename-to) event naming the config file.
    fn concerns(&self, event: &Event) -> bool {
        let Some(file_name) = self.file_name.as_deref() else {
            return false;
        };
        matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
            && event.paths.iter().any(|p| p.file_name() == Some(file_name))
    }

    fn reload(&mut self) {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                // Mid-rename the file can be briefly missing.
                tracing::debug!(path = ?self.path, error = %e, "Config file not readable");
                return;
            }
        };
        // Truncated by an in-place save; the write event follows.
        if content.trim().is_empty() {
            tracing::debug!(path = ?self.path, "Config file empty, skipping");
            return;
        }

        let config = match parse_config(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(
                    path = ?self.path,
                    error = %e,
                    "Ignoring invalid config file, keeping current settings"
                );
                return;
            }
        };

        if self.last_sent.as_ref() == Some(&config) {
            return;
        }

        tracing::info!(
            path = ?self.path,
            gate_enabled = config.gate.enabled,
            blocked_major = config.gate.blocked_major,
            "Config file changed"
        );
        if self.update_tx.send(config.clone()).is_err() {
            tracing::debug!("Config update receiver dropped");
        }
        self.last_sent = Some(config);
    }
}

fn watch_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

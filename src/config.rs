//! Global Configuration
//!
//! Constants that define the template archive format and the defaults of the
//! tool, plus the persisted [`Settings`] read from the user configuration file.
//!
//! Resolution order for every setting is: command line flag, environment
//! (template directory only), configuration file, built-in default.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TemplateError;

/// Application name used in directory names and user-facing output
pub const APP_NAME: &str = "tdmcli";

/// Version reported by `tdmcli version` and compared by the update check
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// File extension for template archives (without the leading dot)
pub const FILE_EXTENSION: &str = "tdmcli";

/// Shared obfuscation key used when no key is configured
///
/// This is not a secret. Every installation shares it so that archives can be
/// exchanged between users.
pub const DEFAULT_KEY: &str = "tdmcliKeyy";

// === Archive Framing ===
// Textual markers that delimit records. See `crate::archive` for the layout.

/// Prefix of the line that opens a file record
pub const FILE_MARKER: &[u8] = b"FILE: ";

/// Prefix of the line that carries the ciphertext length
pub const SIZE_MARKER: &[u8] = b"SIZE: ";

/// Trailer written after the ciphertext of every file record
pub const END_OF_FILE: &[u8] = b"\nEND_OF_FILE\n";

/// Prefix of the line that opens a directory record
pub const DIR_MARKER: &[u8] = b"DIR: ";

/// Line that closes a directory record
pub const END_OF_DIR: &[u8] = b"END_OF_DIR\n";

// === Discovery ===

/// Name of the per-root ignore file
pub const IGNORE_FILE: &str = ".tdmignore";

// === Concurrency ===

/// Worker threads per logical CPU when no explicit worker count is configured
///
/// The work is dominated by file I/O, so the pool is oversubscribed.
pub const WORKER_MULTIPLIER: usize = 4;

/// Result channel capacity per worker thread
pub const CHANNEL_DEPTH: usize = 2;

// === Store and Update Check ===

/// Environment variable that overrides the template directory
pub const TEMPLATE_DIR_ENV: &str = "TDMCLI_TEMPLATE_DIR";

/// Name of the configuration file inside `<config_dir>/tdmcli`
pub const CONFIG_FILE: &str = "config.toml";

/// Plaintext endpoint that serves the latest released version
pub const VERSION_URL: &str = "https://raw.githubusercontent.com/MrTigerST/tdmcli/main/version";

/// Timeout for the update check request, in seconds
pub const UPDATE_TIMEOUT_SECS: u64 = 5;

/// Default worker count: [`WORKER_MULTIPLIER`] times the detected parallelism.
#[must_use]
pub fn default_workers() -> usize {
    let cpus = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    cpus * WORKER_MULTIPLIER
}

/// Settings persisted in `config.toml`.
///
/// Every field is optional; absent fields fall back to the defaults above.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the template archives.
    pub template_dir: Option<PathBuf>,

    /// Size of the worker pool.
    pub workers: Option<usize>,

    /// Obfuscation key.
    pub key: Option<String>,
}

impl Settings {
    /// Location of the configuration file, `None` when the platform has no config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Loads settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no configuration file");
                return Ok(Self::default());
            }
            Err(e) => return Err(TemplateError::io(path, e)),
        };

        toml::from_str(&contents).map_err(|e| TemplateError::Config(format!("{}: {e}", path.display())))
    }

    /// Writes settings to `path`, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<(), TemplateError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| TemplateError::io(parent, e))?;
        }

        let contents = toml::to_string(self).map_err(|e| TemplateError::Config(e.to_string()))?;
        fs::write(path, contents).map_err(|e| TemplateError::io(path, e))
    }

    /// Effective worker count, never zero.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers.filter(|&n| n > 0).unwrap_or_else(default_workers)
    }
}

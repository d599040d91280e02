// crates/perf-shard-core/src/runtime/logs.rs
// ============================================================================
// Module: Log Publishing
// Description: Directory-backed log stream publisher.
// Purpose: Store benchmark logs and link indexes where a viewer can reach them.
// Dependencies: crate::interfaces, rand, url
// ============================================================================

//! ## Overview
//! Each published stream becomes one file named `<name>_<suffix>` under the
//! publisher root, where the suffix is random hex so that repeated names never
//! collide. The returned link is a `file://` URL for the written file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use rand::Rng;
use url::Url;

use crate::interfaces::JSON_CONTENT_TYPE;
use crate::interfaces::LogPublisher;
use crate::interfaces::PublishError;

// ============================================================================
// SECTION: Publisher
// ============================================================================

/// Publisher writing log streams into a directory.
#[derive(Debug, Clone)]
pub struct DirectoryLogPublisher {
    /// Absolute directory receiving streams.
    root: PathBuf,
}

impl DirectoryLogPublisher {
    /// Creates a publisher rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when the directory cannot be created or resolved.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, PublishError> {
        let root = root.as_ref();
        let fail = |error: std::io::Error| PublishError::Write {
            name: root.display().to_string(),
            error: error.to_string(),
        };
        fs::create_dir_all(root).map_err(fail)?;
        let root = fs::canonicalize(root).map_err(fail)?;
        Ok(Self {
            root,
        })
    }

    /// Returns the publisher root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl LogPublisher for DirectoryLogPublisher {
    fn publish(
        &self,
        name: &str,
        content: &str,
        content_type: Option<&str>,
    ) -> Result<String, PublishError> {
        let extension = if content_type == Some(JSON_CONTENT_TYPE) { "json" } else { "txt" };
        let file_name = format!("{}.{extension}", unique_stream_name(name));
        let path = self.root.join(file_name);
        fs::write(&path, content).map_err(|err| PublishError::Write {
            name: name.to_string(),
            error: err.to_string(),
        })?;
        let url = Url::from_file_path(&path).map_err(|()| PublishError::Write {
            name: name.to_string(),
            error: format!("{} is not an absolute path", path.display()),
        })?;
        Ok(url.into())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns `<sanitized name>_<random hex>`.
#[must_use]
pub fn unique_stream_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.') { ch } else { '_' })
        .collect();
    let suffix: u128 = rand::thread_rng().r#gen();
    format!("{sanitized}_{suffix:032x}")
}

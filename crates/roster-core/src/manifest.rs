//! Registry manifests: JSON configuration applied to a populated registry.
//!
//! A manifest never registers implementation types — registration stays an
//! explicit call in application code. It decorates records the application
//! has already registered: extra aliases, metadata bags, and per-record
//! tracking toggles.
//!
//! ```json
//! {
//!   "entries": [
//!     { "class": "sphere", "aliases": ["ball"], "data": { "color": "red" }, "track": true }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, RosterError};
use crate::registry::{ClassData, ClassFactory};

/// Configuration for one registered class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Registered name (or alias) of the class this entry configures.
    pub class: String,
    /// Extra aliases to bind.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Replacement metadata bag; an empty map leaves the record's bag alone.
    #[serde(default)]
    pub data: ClassData,
    /// Per-record tracking toggle.
    #[serde(default)]
    pub track: Option<bool>,
}

/// A set of manifest entries, loaded from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryManifest {
    #[serde(default)]
    pub entries: Vec<ManifestEntry>,
}

impl RegistryManifest {
    /// Load a manifest from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| RosterError::Io {
            message: format!("Failed to read manifest: {}", e),
            path: Some(path.to_path_buf()),
            source: Some(e),
        })?;

        let manifest = Self::parse(&content)?;
        debug!(
            "Loaded {} manifest entries from {}",
            manifest.entries.len(),
            path.display()
        );
        Ok(manifest)
    }

    /// Parse a manifest from a JSON string.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: RegistryManifest =
            serde_json::from_str(content).map_err(|e| RosterError::Json {
                message: format!("Failed to parse manifest: {}", e),
                source: Some(e),
            })?;

        for entry in &manifest.entries {
            if entry.class.is_empty() {
                return Err(RosterError::Manifest {
                    message: "Manifest entry has an empty class name".to_string(),
                });
            }
        }

        Ok(manifest)
    }

    /// Apply every entry to `factory`, returning how many were applied.
    ///
    /// Entries naming classes the registry does not contain are skipped
    /// with a warning rather than failing the whole manifest.
    pub fn apply<C: ?Sized>(&self, factory: &ClassFactory<C>) -> usize {
        let mut applied = 0;

        for entry in &self.entries {
            let Some(record) = factory.record(&entry.class) else {
                warn!(
                    "Manifest entry '{}' does not match a registered class, skipping",
                    entry.class
                );
                continue;
            };

            if !entry.data.is_empty() {
                record.set_data(entry.data.clone());
            }
            if let Some(track) = entry.track {
                record.set_registration_enabled(track);
            }
            for alias in &entry.aliases {
                if !factory.bind_record(alias.clone(), &record) {
                    warn!(
                        "Failed to bind alias '{}' for class '{}'",
                        alias, entry.class
                    );
                }
            }
            applied += 1;
        }

        info!("Applied {} of {} manifest entries", applied, self.entries.len());
        applied
    }
}

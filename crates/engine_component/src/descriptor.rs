//! Persisted type-descriptor versioning.
//!
//! Serialized member data depends on every component type keeping a stable
//! name and byte size between builds. The descriptor file records both for
//! each registered type; at startup [`TypeRegistry::assess_descriptors`]
//! diffs the current registrations against the saved snapshot and reports
//! drift. Drift is never fatal — it is logged and handed back so the caller
//! decides whether to re-save, migrate, or abort the load. Only a malformed
//! descriptor file produces an error.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::registry::TypeRegistry;

/// Format version of the descriptor file itself.
const DESCRIPTOR_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct TypeDescriptor {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Size")]
    size: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct DescriptorFile {
    #[serde(rename = "Version")]
    version: u32,
    #[serde(rename = "Types")]
    types: Vec<TypeDescriptor>,
}

/// A descriptor-file problem that prevents assessment entirely.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// The file could not be read or written.
    #[error("failed to access descriptor file: {0}")]
    Io(#[from] std::io::Error),

    /// The file exists but is not a valid descriptor document.
    #[error("descriptor file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The file was written by an unknown format version.
    #[error("unsupported descriptor file version {0}")]
    UnsupportedVersion(u32),
}

/// A type whose recorded byte size no longer matches the registered one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeDrift {
    /// The type's name.
    pub name: String,
    /// The size recorded in the descriptor file.
    pub recorded: usize,
    /// The size of the current registration.
    pub current: usize,
}

/// The diff between the current registrations and a saved descriptor file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorReport {
    /// Registered now but absent from the file.
    pub added: Vec<String>,
    /// Recorded in the file but no longer registered.
    pub missing: Vec<String>,
    /// Registered under the same name with a different byte size.
    pub resized: Vec<SizeDrift>,
}

impl DescriptorReport {
    /// Returns `true` if the registrations match the saved snapshot
    /// exactly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.added.is_empty() && self.missing.is_empty() && self.resized.is_empty()
    }
}

impl TypeRegistry {
    /// Write a descriptor snapshot of the current registrations.
    pub fn save_descriptors(&self, path: &Path) -> Result<(), DescriptorError> {
        let file = DescriptorFile {
            version: DESCRIPTOR_VERSION,
            types: self
                .iter()
                .map(|info| TypeDescriptor {
                    name: info.name().to_string(),
                    size: info.size(),
                })
                .collect(),
        };
        let text = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Diff the current registrations against the descriptor file at
    /// `path`, logging every mismatch.
    ///
    /// A missing file is treated as a first run: the current snapshot is
    /// saved and an empty report returned. Drift never fails the call;
    /// only an unreadable or malformed file does.
    pub fn assess_descriptors(&self, path: &Path) -> Result<DescriptorReport, DescriptorError> {
        if !path.exists() {
            debug!(path = %path.display(), "no descriptor file; recording current registrations");
            self.save_descriptors(path)?;
            return Ok(DescriptorReport::default());
        }
        let text = std::fs::read_to_string(path)?;
        let file: DescriptorFile = serde_json::from_str(&text)?;
        if file.version != DESCRIPTOR_VERSION {
            return Err(DescriptorError::UnsupportedVersion(file.version));
        }

        let report = self.diff_descriptors(&file.types);
        for name in &report.added {
            warn!(%name, "component type is not present in the descriptor file");
        }
        for name in &report.missing {
            warn!(%name, "descriptor file records a component type that is no longer registered");
        }
        for drift in &report.resized {
            warn!(
                name = %drift.name,
                recorded = drift.recorded,
                current = drift.current,
                "component type changed size since the descriptor file was saved"
            );
        }
        Ok(report)
    }

    fn diff_descriptors(&self, recorded: &[TypeDescriptor]) -> DescriptorReport {
        let mut report = DescriptorReport::default();
        for info in self.iter() {
            match recorded.iter().find(|d| d.name == info.name()) {
                None => report.added.push(info.name().to_string()),
                Some(descriptor) if descriptor.size != info.size() => {
                    report.resized.push(SizeDrift {
                        name: info.name().to_string(),
                        recorded: descriptor.size,
                        current: info.size(),
                    });
                }
                Some(_) => {}
            }
        }
        for descriptor in recorded {
            if self.id_by_name(&descriptor.name).is_none() {
                report.missing.push(descriptor.name.clone());
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::component::Component;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Transform {
        translation: [f32; 3],
    }

    impl Component for Transform {
        fn type_name() -> &'static str {
            "Transform"
        }
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Name {
        value: String,
    }

    impl Component for Name {
        fn type_name() -> &'static str {
            "Name"
        }
    }

    fn make_registry() -> TypeRegistry {
        let mut builder = TypeRegistry::builder();
        builder.register::<Transform>();
        builder.register::<Name>();
        builder.build()
    }

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("engine_component_{tag}_{}.json", std::process::id()))
    }

    #[test]
    fn test_first_run_saves_snapshot() {
        let path = temp_path("first_run");
        let _ = std::fs::remove_file(&path);

        let registry = make_registry();
        let report = registry.assess_descriptors(&path).unwrap();
        assert!(report.is_clean());
        assert!(path.exists());

        // A second assessment against the freshly saved file is clean too.
        let report = registry.assess_descriptors(&path).unwrap();
        assert!(report.is_clean());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_drift_is_reported() {
        let path = temp_path("drift");
        std::fs::write(
            &path,
            serde_json::json!({
                "Version": 1,
                "Types": [
                    { "Name": "Transform", "Size": 4 },
                    { "Name": "Retired", "Size": 16 },
                ],
            })
            .to_string(),
        )
        .unwrap();

        let registry = make_registry();
        let report = registry.assess_descriptors(&path).unwrap();
        assert_eq!(report.added, vec!["Name".to_string()]);
        assert_eq!(report.missing, vec!["Retired".to_string()]);
        assert_eq!(report.resized.len(), 1);
        assert_eq!(report.resized[0].name, "Transform");
        assert_eq!(report.resized[0].recorded, 4);
        assert_eq!(report.resized[0].current, std::mem::size_of::<Transform>());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = temp_path("malformed");
        std::fs::write(&path, "not a descriptor document").unwrap();

        let registry = make_registry();
        let result = registry.assess_descriptors(&path);
        assert!(matches!(result, Err(DescriptorError::Malformed(_))));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unsupported_version_is_an_error() {
        let path = temp_path("version");
        std::fs::write(
            &path,
            serde_json::json!({ "Version": 99, "Types": [] }).to_string(),
        )
        .unwrap();

        let registry = make_registry();
        let result = registry.assess_descriptors(&path);
        assert!(matches!(
            result,
            Err(DescriptorError::UnsupportedVersion(99))
        ));
        let _ = std::fs::remove_file(&path);
    }
}

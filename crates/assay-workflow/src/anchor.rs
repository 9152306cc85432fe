//! Evidence-anchor validation
//!
//! Anchors are plain artifact locations. Relative locations resolve against
//! the workflow root; each destination phase expects its own kind of artifact.

use assay_domain::{EvidenceAnchor, Phase};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Extension of knowledge artifacts
const ARTIFACT_EXTENSION: &str = "md";

/// Human-readable description of the anchor a phase expects
pub fn expected_anchor(to: Phase) -> &'static str {
    match to {
        Phase::Deduction => "a non-empty directory of hypotheses",
        Phase::Induction => "a non-empty .md artifact under knowledge/L1/",
        Phase::Audit | Phase::Decision => "a non-empty .md artifact under knowledge/L2/",
        Phase::Operation => "a holon id",
        Phase::Idle | Phase::Abduction => "a non-empty artifact location",
    }
}

/// Checks that an anchor points at an artifact suitable for the destination phase
#[derive(Debug, Clone)]
pub struct AnchorValidator {
    root: PathBuf,
}

impl AnchorValidator {
    /// Validator resolving relative locations against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Workflow root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate `anchor` for a transition into `to`; the error is the rejection reason
    ///
    /// Entering Operation is gated by a holon id and the threshold check, not
    /// by an artifact, so any anchor passes here.
    pub fn validate(&self, to: Phase, anchor: Option<&EvidenceAnchor>) -> Result<(), String> {
        if to == Phase::Operation {
            return Ok(());
        }

        let uri = match anchor {
            Some(anchor) if !anchor.uri.trim().is_empty() => anchor.uri.trim(),
            _ => return Err("no anchor location given".to_string()),
        };

        match to {
            Phase::Deduction => self.check_directory(uri),
            Phase::Induction => self.check_artifact(uri, "L1"),
            Phase::Audit | Phase::Decision => self.check_artifact(uri, "L2"),
            Phase::Idle | Phase::Abduction | Phase::Operation => Ok(()),
        }
    }

    fn resolve(&self, uri: &str) -> PathBuf {
        let path = Path::new(uri);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn check_directory(&self, uri: &str) -> Result<(), String> {
        let path = self.resolve(uri);
        let mut entries = fs::read_dir(&path)
            .map_err(|e| format!("{} is not a readable directory ({})", path.display(), e))?;
        if entries.next().is_none() {
            return Err(format!("{} is empty", path.display()));
        }
        Ok(())
    }

    fn check_artifact(&self, uri: &str, layer: &str) -> Result<(), String> {
        if !under_layer(Path::new(uri), layer) {
            return Err(format!("{} is not under knowledge/{}/", uri, layer));
        }
        if Path::new(uri).extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXTENSION) {
            return Err(format!("{} is not a .{} artifact", uri, ARTIFACT_EXTENSION));
        }

        let path = self.resolve(uri);
        if path.is_dir() {
            return Err(format!("{} is a directory", path.display()));
        }
        let content =
            fs::read(&path).map_err(|e| format!("cannot read {} ({})", path.display(), e))?;
        if content.is_empty() {
            return Err(format!("{} is empty", path.display()));
        }
        Ok(())
    }
}

/// Whether `path` passes through a `knowledge/<layer>` directory
fn under_layer(path: &Path, layer: &str) -> bool {
    let dirs: Vec<&std::ffi::OsStr> = match path.parent() {
        Some(parent) => parent
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name),
                _ => None,
            })
            .collect(),
        None => return false,
    };
    dirs.windows(2)
        .any(|pair| pair[0] == "knowledge" && pair[1] == layer)
}

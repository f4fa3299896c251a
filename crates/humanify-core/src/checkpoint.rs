//! Resume sidecar: crash-safe progress next to the user's code.
//!
//! The engine never writes the input file. Progress lives in a hidden JSON
//! sidecar derived from the resume path:
//!
//! ```text
//! dirname(R) / "." + basename(R) + "." + md5(resolve(R) [+ "::" + resolve(F)])[0..8]
//!            + ".humanify-resume.json"
//! ```
//!
//! Loads also probe two legacy name schemes (no digest segment, and the
//! plain suffixed path); writes always use the current scheme. Writes are
//! atomic (temp + rename) so readers see old or new state, never a torn
//! file. A sidecar that fails schema validation is ignored and left on
//! disk for inspection.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// File name suffix shared by every sidecar scheme.
pub const SIDECAR_SUFFIX: &str = ".humanify-resume.json";

/// Errors from sidecar I/O. Load failures degrade to a fresh start; write
/// failures are logged by the engine and retried at the next interval.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("sidecar IO error: {0}")]
    Io(#[from] io::Error),

    #[error("sidecar JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persisted engine state.
///
/// The schema is exactly these six fields; anything extra or mistyped is
/// rejected on load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ResumeState {
    /// Current source text, with all applied renames.
    pub code: String,
    /// Names handed out so far, in application order.
    pub renames: Vec<String>,
    /// Identity keys of processed bindings, in visit order.
    pub visited: Vec<String>,
    /// Count of bindings processed.
    #[serde(rename = "currentIndex")]
    pub current_index: u64,
    /// Count of bindings in the original tree.
    #[serde(rename = "totalScopes")]
    pub total_scopes: u64,
    /// The input code file this state belongs to.
    #[serde(rename = "codePath")]
    pub code_path: String,
}

/// Sidecar location for one run: a single write path plus the candidates
/// probed on load.
#[derive(Debug, Clone)]
pub struct SidecarPaths {
    write_path: PathBuf,
    read_candidates: Vec<PathBuf>,
}

fn resolve(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

impl SidecarPaths {
    /// Derive the sidecar location from the resume path and the optional
    /// per-file path.
    pub fn derive(resume_path: &Path, file_path: Option<&Path>) -> Self {
        let dir = resume_path.parent().unwrap_or_else(|| Path::new("."));
        let base = resume_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let resolved = resolve(resume_path);
        let digest_input = match file_path {
            Some(f) => format!("{}::{}", resolved.display(), resolve(f).display()),
            None => resolved.display().to_string(),
        };
        let digest = hex::encode(Md5::digest(digest_input.as_bytes()));
        let write_path = dir.join(format!(".{}.{}{}", base, &digest[..8], SIDECAR_SUFFIX));

        // Legacy schemes, load-only: pre-digest hidden name, and the plain
        // suffixed resume path.
        let legacy_hidden = dir.join(format!(".{}{}", base, SIDECAR_SUFFIX));
        let legacy_plain = PathBuf::from(format!("{}{}", resolved.display(), SIDECAR_SUFFIX));

        SidecarPaths {
            read_candidates: vec![write_path.clone(), legacy_hidden, legacy_plain],
            write_path,
        }
    }

    /// The path writes go to.
    pub fn write_path(&self) -> &Path {
        &self.write_path
    }

    /// Try to load a prior state. Returns `None` when no candidate exists
    /// or when the state fails schema validation (the bad file is kept).
    pub fn load(&self) -> Option<ResumeState> {
        for candidate in &self.read_candidates {
            let raw = match fs::read_to_string(candidate) {
                Ok(raw) => raw,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = %candidate.display(), error = %e, "cannot read sidecar");
                    continue;
                }
            };
            match serde_json::from_str::<ResumeState>(&raw) {
                Ok(state) if state.current_index <= state.total_scopes => {
                    debug!(path = %candidate.display(), "loaded resume state");
                    return Some(state);
                }
                Ok(_) => {
                    warn!(
                        path = %candidate.display(),
                        "sidecar index exceeds total, starting fresh"
                    );
                    return None;
                }
                Err(e) => {
                    warn!(
                        path = %candidate.display(),
                        error = %e,
                        "sidecar failed validation, starting fresh"
                    );
                    return None;
                }
            }
        }
        None
    }

    /// Persist state atomically: write a temp file, then rename over the
    /// sidecar path.
    pub fn save(&self, state: &ResumeState) -> Result<(), CheckpointError> {
        let payload = serde_json::to_vec(state)?;
        let temp = self.write_path.with_file_name(format!(
            "{}.{}.tmp",
            self.write_path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy(),
            std::process::id(),
        ));
        fs::write(&temp, payload)?;
        fs::rename(&temp, &self.write_path)?;
        debug!(path = %self.write_path.display(), "checkpoint written");
        Ok(())
    }

    /// Remove the sidecar after a successful run. Missing files are fine.
    pub fn delete(&self) -> Result<(), CheckpointError> {
        match fs::remove_file(&self.write_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Does the sidecar exist on disk right now?
    pub fn exists(&self) -> bool {
        self.write_path.exists()
    }
}

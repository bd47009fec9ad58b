//! Session hand-off storage
//!
//! Two small file-backed exchanges with the rest of the kiosk:
//! - the identity token written by the face-verification step (consumed)
//! - the result snapshot for the completion view (produced)

use crate::domain::result::ResultSnapshot;
use anyhow::Context;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub struct SessionStore {
    token_file: String,
    snapshot_file: String,
}

impl SessionStore {
    pub fn new(token_file: &str, snapshot_file: &str) -> Self {
        Self { token_file: token_file.to_string(), snapshot_file: snapshot_file.to_string() }
    }

    /// Read the identity token left by face verification.
    /// Absence is a fatal precondition for submission; the caller escalates.
    pub fn load_identity_token(&self) -> Option<String> {
        match fs::read_to_string(&self.token_file) {
            Ok(content) => {
                let token = content.trim();
                if token.is_empty() {
                    warn!(file = %self.token_file, "identity_token_empty");
                    None
                } else {
                    Some(token.to_string())
                }
            }
            Err(e) => {
                warn!(file = %self.token_file, error = %e, "identity_token_unreadable");
                None
            }
        }
    }

    /// Persist the snapshot for the completion view (replaces any previous one)
    pub fn write_snapshot(&self, snapshot: &ResultSnapshot) -> anyhow::Result<()> {
        let path = Path::new(&self.snapshot_file);

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let json = serde_json::to_string(snapshot)?;
        fs::write(path, &json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;

        info!(file = %self.snapshot_file, bytes = %json.len(), "snapshot_written");
        Ok(())
    }

    /// Read back the persisted snapshot (used by the completion view)
    pub fn read_snapshot(&self) -> Option<ResultSnapshot> {
        let content = match fs::read_to_string(&self.snapshot_file) {
            Ok(c) => c,
            Err(e) => {
                debug!(file = %self.snapshot_file, error = %e, "snapshot_unreadable");
                return None;
            }
        };
        serde_json::from_str(&content).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> SessionStore {
        let token = dir.path().join("face_id");
        let snapshot = dir.path().join("results.json");
        SessionStore::new(token.to_str().unwrap(), snapshot.to_str().unwrap())
    }

    #[test]
    fn test_token_missing() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.load_identity_token().is_none());
    }

    #[test]
    fn test_token_trimmed() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(dir.path().join("face_id"), "visitor-42\n").unwrap();
        assert_eq!(store.load_identity_token().as_deref(), Some("visitor-42"));
    }

    #[test]
    fn test_token_empty_is_none() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(dir.path().join("face_id"), "  \n").unwrap();
        assert!(store.load_identity_token().is_none());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let snapshot =
            ResultSnapshot { temperature: "36.6".to_string(), alcohol: "0.00".to_string() };

        store.write_snapshot(&snapshot).unwrap();

        let raw = fs::read_to_string(dir.path().join("results.json")).unwrap();
        assert_eq!(raw, r#"{"temperature":"36.6","alcohol":"0.00"}"#);
        assert_eq!(store.read_snapshot(), Some(snapshot));
    }

    #[test]
    fn test_snapshot_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested").join("results.json");
        let token = dir.path().join("face_id");
        let store = SessionStore::new(token.to_str().unwrap(), nested.to_str().unwrap());

        let snapshot =
            ResultSnapshot { temperature: "36.6".to_string(), alcohol: "0.00".to_string() };
        store.write_snapshot(&snapshot).unwrap();
        assert!(nested.exists());
    }
}

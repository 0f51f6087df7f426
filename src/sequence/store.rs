use std::{
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::SequenceImage;

/// The last opened sequence: the only state that survives a reload within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSequence {
    pub sequence_id: String,
    pub image_id: Option<String>,
    pub images: Vec<SequenceImage>,
}

/// Session-scoped storage for the active sequence.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<ActiveSequence>;
    fn save(&self, active: &ActiveSequence) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Simple in-memory session store.
#[derive(Debug, Default)]
pub struct MemSession {
    slot: Mutex<Option<ActiveSequence>>,
}

impl MemSession {
    pub fn new() -> Self { Self::default() }
}

impl SessionStore for MemSession {
    fn load(&self) -> Option<ActiveSequence> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn save(&self, active: &ActiveSequence) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(active.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Session store persisted as one JSON file, e.g. under a per-session temp dir.
#[derive(Debug, Clone)]
pub struct FileSession {
    path: PathBuf,
}

impl FileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
}

impl SessionStore for FileSession {
    /// A missing or unreadable file reads as "nothing stored".
    fn load(&self) -> Option<ActiveSequence> {
        let bytes = std::fs::read(&self.path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn save(&self, active: &ActiveSequence) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
        let json = serde_json::to_vec(active).context("serialize active sequence")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("write {}", self.path.display()))
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => {
                Err(err).with_context(|| format!("remove {}", self.path.display()))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ActiveSequence {
        ActiveSequence {
            sequence_id: "seq".into(),
            image_id: Some("b".into()),
            images: vec![SequenceImage::new("a", 1.0, 2.0), SequenceImage::new("b", 1.1, 2.1)],
        }
    }

    #[test]
    fn mem_session_roundtrip() {
        let store = MemSession::new();
        assert!(store.load().is_none());
        store.save(&sample()).unwrap();
        assert_eq!(store.load(), Some(sample()));
        store.clear().unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn file_session_survives_a_new_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session").join("active.json");
        FileSession::new(&path).save(&sample()).unwrap();
        assert_eq!(FileSession::new(&path).load(), Some(sample()));
        FileSession::new(&path).clear().unwrap();
        FileSession::new(&path).clear().unwrap();
        assert!(FileSession::new(&path).load().is_none());
    }
}

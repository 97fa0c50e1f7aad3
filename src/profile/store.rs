//! Single-file JSON persistence for the learner profile.
//!
//! The store keeps the profile under one key: a JSON document at a configured
//! path. It is read once at startup and rewritten when onboarding completes.
//! A file that fails to parse is logged and treated as absent, which sends the
//! client back through onboarding instead of failing startup.

use crate::profile::model::UserProfile;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

pub struct ProfileStore {
    /// Location of the profile document
    path: PathBuf,

    /// In-memory copy; None until onboarding has completed at least once
    current: Arc<RwLock<Option<UserProfile>>>,
}

impl ProfileStore {
    /// Create a store over the given path and load whatever is already there.
    ///
    /// Missing file: no profile, onboarding will be required.
    /// Corrupt file: logged and ignored, same outcome as missing.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let current = Self::read_file(&path);

        if current.is_some() {
            info!("Loaded profile from {}", path.display());
        }

        Self {
            path,
            current: Arc::new(RwLock::new(current)),
        }
    }

    fn read_file(path: &Path) -> Option<UserProfile> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return None,
        };

        match serde_json::from_str::<UserProfile>(&raw) {
            Ok(profile) => Some(profile),
            Err(err) => {
                warn!("Failed to parse saved profile at {}: {}", path.display(), err);
                None
            }
        }
    }

    /// Persist a new profile, replacing any previous one.
    pub fn save(&self, profile: &UserProfile) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create profile directory: {}", e))?;
            }
        }

        let json = serde_json::to_string_pretty(profile)
            .map_err(|e| format!("Failed to serialize profile: {}", e))?;
        fs::write(&self.path, json)
            .map_err(|e| format!("Failed to write profile file: {}", e))?;

        *self.current.write().unwrap() = Some(profile.clone());
        info!("Profile saved for '{}'", profile.name);
        Ok(())
    }

    /// Get a copy of the current profile, if onboarded.
    pub fn get(&self) -> Option<UserProfile> {
        self.current.read().unwrap().clone()
    }

    pub fn is_onboarded(&self) -> bool {
        self.current.read().unwrap().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::model::{EnglishLevel, LearningGoal, PersonaType};
    use chrono::Utc;
    use uuid::Uuid;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("fluentify-test-{}", Uuid::new_v4()))
            .join("profile.json")
    }

    fn sample_profile() -> UserProfile {
        UserProfile {
            name: "Mina".to_string(),
            level: EnglishLevel::Beginner,
            goals: vec![LearningGoal::Vocabulary],
            persona: PersonaType::Emma,
            streak: 3,
            last_active: Utc::now(),
        }
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_path();
        let store = ProfileStore::open(&path);
        assert!(!store.is_onboarded());

        store.save(&sample_profile()).unwrap();
        assert!(store.is_onboarded());

        // A fresh store over the same path sees the saved profile.
        let reopened = ProfileStore::open(&path);
        let profile = reopened.get().unwrap();
        assert_eq!(profile.name, "Mina");
        assert_eq!(profile.level, EnglishLevel::Beginner);
        assert_eq!(profile.streak, 3);
    }

    #[test]
    fn test_corrupt_file_treated_as_absent() {
        let path = temp_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json at all").unwrap();

        let store = ProfileStore::open(&path);
        assert!(store.get().is_none());

        // The store stays usable: a save overwrites the corrupt document.
        store.save(&sample_profile()).unwrap();
        assert!(ProfileStore::open(&path).is_onboarded());
    }

    #[test]
    fn test_missing_file_is_not_onboarded() {
        let store = ProfileStore::open(temp_path());
        assert!(store.get().is_none());
    }
}

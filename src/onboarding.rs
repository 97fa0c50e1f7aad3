//! # Onboarding Wizard
//!
//! Server-side implementation of the 3-step onboarding flow that produces a
//! learner profile:
//!
//! 1. **Name**: free-text name entry (must be non-empty after trimming)
//! 2. **Level**: proficiency choice from the closed level enumeration
//! 3. **Goals**: multi-select over the goal tags (toggle semantics)
//!
//! The stepper is strictly linear with no backward data dependency: going back
//! never discards what was entered, it only moves the cursor. Completion
//! validates the accumulated draft, stamps streak and last-active, and hands
//! the finished profile to the caller.
//!
//! Drafts live in an in-memory manager keyed by draft id so a client can drive
//! the wizard over plain REST calls.

use crate::profile::model::{EnglishLevel, LearningGoal, PersonaType, UserProfile};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Position of the wizard cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Name,
    Level,
    Goals,
}

impl WizardStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStep::Name => "name",
            WizardStep::Level => "level",
            WizardStep::Goals => "goals",
        }
    }
}

/// One in-flight onboarding draft.
#[derive(Debug, Clone)]
pub struct OnboardingWizard {
    pub draft_id: String,
    step: WizardStep,
    name: String,
    level: EnglishLevel,
    goals: Vec<LearningGoal>,
    pub created_at: DateTime<Utc>,
}

impl OnboardingWizard {
    /// Start a fresh draft. Level defaults to Intermediate and the goal set is
    /// seeded with Speaking Fluency, matching the choices most users keep.
    pub fn new(draft_id: String) -> Self {
        Self {
            draft_id,
            step: WizardStep::Name,
            name: String::new(),
            level: EnglishLevel::Intermediate,
            goals: vec![LearningGoal::SpeakingFluency],
            created_at: Utc::now(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> EnglishLevel {
        self.level
    }

    pub fn goals(&self) -> &[LearningGoal] {
        &self.goals
    }

    /// Step 1: record the name and advance to level selection.
    pub fn set_name(&mut self, name: &str) -> Result<(), String> {
        if self.step != WizardStep::Name {
            return Err(format!("Name can only be set in step 'name', not '{}'", self.step.as_str()));
        }

        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err("Name cannot be empty".to_string());
        }

        self.name = trimmed.to_string();
        self.step = WizardStep::Level;
        Ok(())
    }

    /// Step 2: record the level and advance to goal selection.
    pub fn set_level(&mut self, level: EnglishLevel) -> Result<(), String> {
        if self.step != WizardStep::Level {
            return Err(format!("Level can only be set in step 'level', not '{}'", self.step.as_str()));
        }

        self.level = level;
        self.step = WizardStep::Goals;
        Ok(())
    }

    /// Step 3: toggle a goal tag in or out of the selection.
    pub fn toggle_goal(&mut self, goal: LearningGoal) -> Result<(), String> {
        if self.step != WizardStep::Goals {
            return Err(format!("Goals can only be edited in step 'goals', not '{}'", self.step.as_str()));
        }

        if let Some(pos) = self.goals.iter().position(|g| *g == goal) {
            self.goals.remove(pos);
        } else {
            self.goals.push(goal);
        }
        Ok(())
    }

    /// Move the cursor one step back, preserving everything entered so far.
    pub fn back(&mut self) -> Result<(), String> {
        self.step = match self.step {
            WizardStep::Name => return Err("Already at the first step".to_string()),
            WizardStep::Level => WizardStep::Name,
            WizardStep::Goals => WizardStep::Level,
        };
        Ok(())
    }

    /// Validate the draft and build the final profile.
    ///
    /// Requires the cursor to be on the goals step with a non-empty name and at
    /// least one selected goal. An empty goal set is rejected here rather than
    /// during toggling, so users can still clear and rebuild the selection.
    pub fn complete(&self) -> Result<UserProfile, String> {
        if self.step != WizardStep::Goals {
            return Err(format!("Cannot complete onboarding from step '{}'", self.step.as_str()));
        }

        if self.name.trim().is_empty() {
            return Err("Name cannot be empty".to_string());
        }

        if self.goals.is_empty() {
            return Err("Select at least one learning goal".to_string());
        }

        Ok(UserProfile {
            name: self.name.clone(),
            level: self.level,
            goals: self.goals.clone(),
            persona: PersonaType::Emma,
            streak: 0,
            last_active: Utc::now(),
        })
    }
}

/// Tracks in-flight onboarding drafts.
pub struct OnboardingManager {
    drafts: Arc<RwLock<HashMap<String, OnboardingWizard>>>,

    /// Maximum number of concurrent drafts kept in memory
    max_drafts: usize,
}

impl OnboardingManager {
    pub fn new(max_drafts: usize) -> Self {
        Self {
            drafts: Arc::new(RwLock::new(HashMap::new())),
            max_drafts,
        }
    }

    /// Open a new draft and return its id.
    pub fn begin(&self) -> Result<OnboardingWizard, String> {
        let mut drafts = self.drafts.write().unwrap();

        if drafts.len() >= self.max_drafts {
            return Err(format!(
                "Maximum concurrent onboarding drafts ({}) reached",
                self.max_drafts
            ));
        }

        let draft_id = Uuid::new_v4().to_string();
        let wizard = OnboardingWizard::new(draft_id.clone());
        drafts.insert(draft_id, wizard.clone());
        Ok(wizard)
    }

    /// Get a snapshot of a draft.
    pub fn get(&self, draft_id: &str) -> Option<OnboardingWizard> {
        self.drafts.read().unwrap().get(draft_id).cloned()
    }

    /// Apply a mutation to a draft and return the updated snapshot.
    pub fn update<F>(&self, draft_id: &str, apply: F) -> Result<OnboardingWizard, String>
    where
        F: FnOnce(&mut OnboardingWizard) -> Result<(), String>,
    {
        let mut drafts = self.drafts.write().unwrap();
        let wizard = drafts
            .get_mut(draft_id)
            .ok_or_else(|| format!("Unknown onboarding draft '{}'", draft_id))?;
        apply(wizard)?;
        Ok(wizard.clone())
    }

    /// Validate and finish a draft. On success the draft is removed and the
    /// completed profile returned.
    pub fn complete(&self, draft_id: &str) -> Result<UserProfile, String> {
        let mut drafts = self.drafts.write().unwrap();
        let wizard = drafts
            .get(draft_id)
            .ok_or_else(|| format!("Unknown onboarding draft '{}'", draft_id))?;
        let profile = wizard.complete()?;
        drafts.remove(draft_id);
        Ok(profile)
    }

    /// Discard a draft without completing it.
    pub fn abandon(&self, draft_id: &str) -> bool {
        self.drafts.write().unwrap().remove(draft_id).is_some()
    }

    pub fn active_draft_count(&self) -> usize {
        self.drafts.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_flow_produces_valid_profile() {
        let mut wizard = OnboardingWizard::new("d1".to_string());
        wizard.set_name("  Mina  ").unwrap();
        wizard.set_level(EnglishLevel::Advanced).unwrap();
        wizard.toggle_goal(LearningGoal::Grammar).unwrap();

        let profile = wizard.complete().unwrap();
        assert_eq!(profile.name, "Mina");
        assert!(!profile.name.is_empty());
        assert!(EnglishLevel::ALL.contains(&profile.level));
        assert_eq!(
            profile.goals,
            vec![LearningGoal::SpeakingFluency, LearningGoal::Grammar]
        );
        assert_eq!(profile.streak, 0);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut wizard = OnboardingWizard::new("d1".to_string());
        assert!(wizard.set_name("   ").is_err());
        assert_eq!(wizard.step(), WizardStep::Name);
    }

    #[test]
    fn test_steps_are_linear() {
        let mut wizard = OnboardingWizard::new("d1".to_string());
        // Level and goals are not reachable before the name step is done.
        assert!(wizard.set_level(EnglishLevel::Beginner).is_err());
        assert!(wizard.toggle_goal(LearningGoal::Grammar).is_err());
        assert!(wizard.complete().is_err());

        wizard.set_name("Mina").unwrap();
        assert!(wizard.complete().is_err());
        wizard.set_level(EnglishLevel::Beginner).unwrap();
        assert!(wizard.complete().is_ok());
    }

    #[test]
    fn test_empty_goal_set_rejected_at_completion() {
        let mut wizard = OnboardingWizard::new("d1".to_string());
        wizard.set_name("Mina").unwrap();
        wizard.set_level(EnglishLevel::Intermediate).unwrap();
        // Deselect the seeded default.
        wizard.toggle_goal(LearningGoal::SpeakingFluency).unwrap();
        assert!(wizard.goals().is_empty());
        assert!(wizard.complete().is_err());

        // Re-selecting any goal makes the draft completable again.
        wizard.toggle_goal(LearningGoal::ExamPractice).unwrap();
        assert!(wizard.complete().is_ok());
    }

    #[test]
    fn test_back_preserves_entered_data() {
        let mut wizard = OnboardingWizard::new("d1".to_string());
        wizard.set_name("Mina").unwrap();
        wizard.set_level(EnglishLevel::Advanced).unwrap();
        wizard.back().unwrap();
        assert_eq!(wizard.step(), WizardStep::Level);
        wizard.back().unwrap();
        assert_eq!(wizard.step(), WizardStep::Name);
        assert!(wizard.back().is_err());

        assert_eq!(wizard.name(), "Mina");
        assert_eq!(wizard.level(), EnglishLevel::Advanced);
    }

    #[test]
    fn test_manager_draft_lifecycle() {
        let manager = OnboardingManager::new(2);
        let draft = manager.begin().unwrap();

        manager.update(&draft.draft_id, |w| w.set_name("Mina")).unwrap();
        manager
            .update(&draft.draft_id, |w| w.set_level(EnglishLevel::Beginner))
            .unwrap();

        let profile = manager.complete(&draft.draft_id).unwrap();
        assert_eq!(profile.name, "Mina");
        // Completion consumes the draft.
        assert!(manager.get(&draft.draft_id).is_none());
        assert_eq!(manager.active_draft_count(), 0);
    }

    #[test]
    fn test_manager_enforces_draft_cap() {
        let manager = OnboardingManager::new(1);
        let _first = manager.begin().unwrap();
        assert!(manager.begin().is_err());
    }

    #[test]
    fn test_unknown_draft_errors() {
        let manager = OnboardingManager::new(4);
        assert!(manager.update("nope", |w| w.set_name("x")).is_err());
        assert!(manager.complete("nope").is_err());
        assert!(!manager.abandon("nope"));
    }
}

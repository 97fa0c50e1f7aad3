//! # User Profile Module
//!
//! Holds the learner profile produced by onboarding and its persistence.
//! The profile is the only durable piece of state in the application: one
//! JSON document on disk, read once at startup and rewritten whenever
//! onboarding completes.
//!
//! ## Key Components:
//! - **Model**: profile struct plus the closed enumerations it draws from
//!   (English level, learning goals, persona)
//! - **Store**: single-file JSON persistence with corrupt-file tolerance

pub mod model;
pub mod store;

pub use model::{EnglishLevel, LearningGoal, PersonaConfig, PersonaType, UserProfile};
pub use store::ProfileStore;

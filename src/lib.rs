//! Classroom advisory engine.
//!
//! Grade predictions, group suggestions, learning insights, intervention
//! lists and parent communications, produced by a hosted model when a
//! credential is configured and by deterministic heuristics otherwise.

pub mod advisor;
pub mod capability;
pub mod confidence;
pub mod config;
pub mod db;
pub mod error;
pub mod heuristics;
pub mod model;
pub mod models;
pub mod parse;
pub mod prompts;
pub mod report;

pub use advisor::{Advisor, Advisory, AdvisorySource, ClassroomOverview};
pub use capability::Capability;
pub use config::AdvisorConfig;
pub use error::{AdvisorError, ProviderError};
pub use models::{
    AdvisorStatus, GradePrediction, Group, GroupPurpose, GroupSuggestion, InsightType,
    LearningInsight, ParentCommunication, RiskLevel, Student, Tone, Urgency,
};

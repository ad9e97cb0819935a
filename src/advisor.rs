//! Advisory orchestrator.
//!
//! Each operation picks a path up front: the hosted model when the
//! capability is present, the heuristics otherwise. A model-path failure of
//! any kind reruns the same input through the heuristics, so callers always
//! get a fully typed result. [`Advisory`] records which path produced it.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::capability::Capability;
use crate::config::AdvisorConfig;
use crate::confidence;
use crate::error::AdvisorError;
use crate::heuristics;
use crate::model::{GeminiClient, ModelInvoker, TextModel};
use crate::models::{
    AdvisorStatus, GradePrediction, GroupPurpose, GroupSuggestion, LearningInsight,
    ParentCommunication, Student,
};
use crate::parse;
use crate::prompts;

pub const MODEL_MODE_MESSAGE: &str = "AI features fully available with Google Gemini integration";
pub const DEMO_MODE_MESSAGE: &str =
    "AI features running in demo mode. Add GOOGLE_GENERATIVE_AI_API_KEY for full functionality.";

/// Students whose trajectories are analysed by [`Advisor::classroom_overview`].
pub const OVERVIEW_INSIGHT_STUDENTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisorySource {
    Model,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Advisory<T> {
    Model(T),
    Heuristic(T),
}

impl<T> Advisory<T> {
    pub fn source(&self) -> AdvisorySource {
        match self {
            Advisory::Model(_) => AdvisorySource::Model,
            Advisory::Heuristic(_) => AdvisorySource::Heuristic,
        }
    }

    pub fn is_model(&self) -> bool {
        matches!(self, Advisory::Model(_))
    }

    pub fn get(&self) -> &T {
        match self {
            Advisory::Model(value) | Advisory::Heuristic(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Advisory::Model(value) | Advisory::Heuristic(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Path {
    Model,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomOverview {
    pub status: AdvisorStatus,
    pub predictions: Vec<GradePrediction>,
    pub groups: Vec<GroupSuggestion>,
    pub insights: Vec<LearningInsight>,
}

#[derive(Clone)]
pub struct Advisor {
    invoker: ModelInvoker,
}

impl Advisor {
    pub fn new(capability: Capability, model: Option<Arc<dyn TextModel>>) -> Self {
        Self {
            invoker: ModelInvoker::new(capability, model),
        }
    }

    /// Wires the Gemini client when the configuration carries a credential.
    pub fn from_config(config: &AdvisorConfig) -> anyhow::Result<Self> {
        let model = GeminiClient::from_config(config)?
            .map(|client| Arc::new(client) as Arc<dyn TextModel>);
        Ok(Self::new(config.capability.clone(), model))
    }

    pub fn offline() -> Self {
        Self::new(Capability::unavailable(), None)
    }

    pub fn is_available(&self) -> bool {
        self.invoker.is_available()
    }

    pub fn status(&self) -> AdvisorStatus {
        if self.is_available() {
            AdvisorStatus {
                available: true,
                message: MODEL_MODE_MESSAGE.to_string(),
            }
        } else {
            AdvisorStatus {
                available: false,
                message: DEMO_MODE_MESSAGE.to_string(),
            }
        }
    }

    fn select_path(&self) -> Path {
        if self.is_available() {
            Path::Model
        } else {
            Path::Heuristic
        }
    }

    async fn run<T, Fut>(
        &self,
        operation: &'static str,
        subject: &str,
        model_path: impl FnOnce() -> Fut,
        heuristic_path: impl FnOnce() -> T,
    ) -> Advisory<T>
    where
        Fut: Future<Output = Result<T, AdvisorError>>,
    {
        if self.select_path() == Path::Heuristic {
            return Advisory::Heuristic(heuristic_path());
        }

        match model_path().await {
            Ok(value) => Advisory::Model(value),
            Err(err) => {
                if err.is_expected() {
                    tracing::debug!(operation, subject, "model path unavailable, using heuristics");
                } else {
                    tracing::warn!(
                        operation,
                        subject,
                        kind = err.kind(),
                        error = %err,
                        "model path failed, falling back to heuristics"
                    );
                }
                Advisory::Heuristic(heuristic_path())
            }
        }
    }

    pub async fn predict_grade(
        &self,
        student: &Student,
        context: Option<&str>,
    ) -> Advisory<GradePrediction> {
        self.run(
            "predict_grade",
            &student.id,
            move || async move {
                let text = self
                    .invoker
                    .invoke(&prompts::grade_prediction(student, context), prompts::PREDICTION_SYSTEM)
                    .await?;
                let fields = parse::prediction(&text)?;
                Ok::<_, AdvisorError>(GradePrediction {
                    student_id: student.id.clone(),
                    predicted_grade: fields.predicted_grade,
                    confidence: confidence::score(student, false),
                    risk_level: fields.risk_level,
                    interventions: fields.interventions,
                    reasoning: fields.reasoning,
                })
            },
            || heuristics::predict_grade(student),
        )
        .await
    }

    /// One prediction per student, in roster order. A failure for one
    /// student only affects that student's entry.
    pub async fn predict_grades(
        &self,
        students: &[Student],
        context: Option<&str>,
    ) -> Vec<GradePrediction> {
        tracing::info!(
            count = students.len(),
            mode = if self.is_available() { "model" } else { "demo" },
            "generating grade predictions"
        );

        let mut predictions = Vec::with_capacity(students.len());
        for student in students {
            predictions.push(self.predict_grade(student, context).await.into_inner());
        }
        predictions
    }

    pub async fn suggest_groups_advisory(
        &self,
        students: &[Student],
        purpose: GroupPurpose,
    ) -> Advisory<Vec<GroupSuggestion>> {
        self.run(
            "suggest_groups",
            purpose.as_str(),
            move || async move {
                let text = self
                    .invoker
                    .invoke(&prompts::group_suggestions(students, purpose), prompts::GROUPS_SYSTEM)
                    .await?;
                parse::group_suggestions(&text, students, purpose)
            },
            || heuristics::suggest_groups(students, purpose),
        )
        .await
    }

    pub async fn suggest_optimal_groups(
        &self,
        students: &[Student],
        purpose: GroupPurpose,
    ) -> Vec<GroupSuggestion> {
        self.suggest_groups_advisory(students, purpose)
            .await
            .into_inner()
    }

    pub async fn analyze_trajectory_advisory(
        &self,
        student: &Student,
        history: Option<&[Value]>,
    ) -> Advisory<Vec<LearningInsight>> {
        let history = history.unwrap_or(&[]);
        self.run(
            "analyze_learning_trajectory",
            &student.id,
            move || async move {
                let text = self
                    .invoker
                    .invoke(&prompts::learning_trajectory(student, history), prompts::INSIGHTS_SYSTEM)
                    .await?;
                parse::learning_insights(&text)
            },
            || heuristics::learning_insights(student),
        )
        .await
    }

    pub async fn analyze_learning_trajectory(
        &self,
        student: &Student,
        history: Option<&[Value]>,
    ) -> Vec<LearningInsight> {
        self.analyze_trajectory_advisory(student, history)
            .await
            .into_inner()
    }

    pub async fn interventions_advisory(
        &self,
        student: &Student,
        risk_factors: &[String],
    ) -> Advisory<Vec<String>> {
        self.run(
            "generate_intervention_strategies",
            &student.id,
            move || async move {
                let text = self
                    .invoker
                    .invoke(
                        &prompts::intervention_strategies(student, risk_factors),
                        prompts::INTERVENTIONS_SYSTEM,
                    )
                    .await?;
                parse::interventions(&text)
            },
            || heuristics::intervention_strategies(student, risk_factors),
        )
        .await
    }

    pub async fn generate_intervention_strategies(
        &self,
        student: &Student,
        risk_factors: &[String],
    ) -> Vec<String> {
        self.interventions_advisory(student, risk_factors)
            .await
            .into_inner()
    }

    pub async fn communication_advisory(
        &self,
        student: &Student,
        context: &str,
    ) -> Advisory<ParentCommunication> {
        self.run(
            "generate_parent_communication",
            &student.id,
            move || async move {
                let text = self
                    .invoker
                    .invoke(
                        &prompts::parent_communication(student, context),
                        prompts::COMMUNICATION_SYSTEM,
                    )
                    .await?;
                parse::parent_communication(&text)
            },
            || heuristics::parent_communication(student, context),
        )
        .await
    }

    pub async fn generate_parent_communication(
        &self,
        student: &Student,
        context: &str,
    ) -> ParentCommunication {
        self.communication_advisory(student, context)
            .await
            .into_inner()
    }

    /// Predictions, collaborative groups and the first few students'
    /// trajectories, generated concurrently.
    pub async fn classroom_overview(
        &self,
        students: &[Student],
        context: Option<&str>,
    ) -> ClassroomOverview {
        let insights = async {
            let mut insights = Vec::new();
            for student in students.iter().take(OVERVIEW_INSIGHT_STUDENTS) {
                insights.extend(self.analyze_learning_trajectory(student, None).await);
            }
            insights
        };

        let (predictions, groups, insights) = tokio::join!(
            self.predict_grades(students, context),
            self.suggest_optimal_groups(students, GroupPurpose::Collaborative),
            insights,
        );

        ClassroomOverview {
            status: self.status(),
            predictions,
            groups,
            insights,
        }
    }
}

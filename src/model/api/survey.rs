use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rocket::serde::json::Value;
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{
        id::ApiId,
        validation::{choice_index, trimmed, Violation, Violations},
    },
    common::{ResourceMetadata, ResourceStatus, TallyResult},
    db::{NewSurvey, Question, Survey, SurveyAnswers, SurveyCore},
    mongodb::Id,
};

pub const MIN_QUESTIONS: usize = 1;
pub const MAX_QUESTIONS: usize = 50;
pub const MAX_PROMPT_LENGTH: usize = 500;

/// A single question in a [`SurveySpec`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionSpec {
    pub prompt: String,
    pub options: Vec<String>,
}

impl From<QuestionSpec> for Question {
    fn from(spec: QuestionSpec) -> Self {
        Self {
            prompt: spec.prompt.trim().to_string(),
            options: trimmed(spec.options),
        }
    }
}

/// A survey specification, as submitted by a moderator or admin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveySpec {
    pub title: String,
    pub description: String,
    pub questions: Vec<QuestionSpec>,
    pub end_date: Option<DateTime<Utc>>,
}

impl SurveySpec {
    /// Check every field, reporting all violations together.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), Vec<Violation>> {
        let mut violations = Violations::new();
        violations.check_metadata(&self.title, &self.description, self.end_date, now);
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&self.questions.len()) {
            violations.push(
                "questions",
                format!("must have between {MIN_QUESTIONS} and {MAX_QUESTIONS} questions"),
            );
        }
        for (i, question) in self.questions.iter().enumerate() {
            violations.check_length(
                &format!("questions[{i}].prompt"),
                &question.prompt,
                1,
                MAX_PROMPT_LENGTH,
            );
            violations.check_options(&format!("questions[{i}].options"), &question.options);
        }
        violations.into_result()
    }

    /// Convert a validated spec into a survey ready for insertion.
    pub fn into_survey(self, created_by: Id, now: DateTime<Utc>) -> NewSurvey {
        NewSurvey {
            metadata: ResourceMetadata::new(
                self.title.trim().to_string(),
                self.description.trim().to_string(),
                created_by,
                self.end_date,
                now,
            ),
            questions: self.questions.into_iter().map(Question::from).collect(),
        }
    }
}

/// An API-friendly survey description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyDescription {
    pub id: ApiId,
    pub title: String,
    pub description: String,
    /// Effective status: closed once the end date has passed.
    pub status: ResourceStatus,
    pub created_by: ApiId,
    pub created_at: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub questions: Vec<Question>,
}

impl SurveyDescription {
    pub fn new(survey: Survey, now: DateTime<Utc>) -> Self {
        let status = survey.metadata.effective_status(now);
        let SurveyCore {
            metadata,
            questions,
        } = survey.survey;
        Self {
            id: survey.id.into(),
            title: metadata.title,
            description: metadata.description,
            status,
            created_by: metadata.created_by.into(),
            created_at: metadata.created_at,
            end_date: metadata.end_date,
            questions,
        }
    }
}

/// A survey together with a live tally for each of its questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyView {
    pub resource: SurveyDescription,
    /// One tally per question, in question order.
    pub tally: Vec<TallyResult>,
    /// Number of responses to the survey as a whole.
    pub total: u64,
}

impl SurveyView {
    pub fn new(survey: Survey, tally: Vec<TallyResult>, total: u64, now: DateTime<Utc>) -> Self {
        Self {
            resource: SurveyDescription::new(survey, now),
            tally,
            total,
        }
    }
}

/// A request to respond to a survey: an option index for each question index.
///
/// Keys and choices are kept as submitted and checked in [`Self::answers_for`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyResponseRequest {
    pub answers: BTreeMap<String, Value>,
}

impl SurveyResponseRequest {
    /// The answers as a positional list, if they answer every one of
    /// `survey`'s questions exactly once with one of its options.
    pub fn answers_for(&self, survey: &SurveyCore) -> Result<SurveyAnswers, String> {
        let questions = &survey.questions;
        let mut by_question = BTreeMap::new();
        for (key, choice) in &self.answers {
            let q = key
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&q| q < questions.len())
                .ok_or_else(|| {
                    format!(
                        "Question {key} does not exist: the survey has {} questions",
                        questions.len()
                    )
                })?;
            if by_question.insert(q, choice).is_some() {
                return Err(format!("Question {q} is answered more than once"));
            }
        }

        questions
            .iter()
            .enumerate()
            .map(|(q, question)| {
                let choice = by_question
                    .get(&q)
                    .ok_or_else(|| format!("Question {q} has not been answered"))?;
                choice_index(choice, question.options.len())
                    .and_then(|index| u32::try_from(index).ok())
                    .ok_or_else(|| {
                        format!(
                            "Choice {choice} for question {q} is not an option: it has {} options",
                            question.options.len()
                        )
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(SurveyAnswers)
    }
}

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{common::ResourceMetadata, mongodb::Id};

/// A single multiple-choice survey question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
}

/// Core survey data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyCore {
    #[serde(flatten)]
    pub metadata: ResourceMetadata,
    /// The questions, in display order.
    pub questions: Vec<Question>,
}

impl SurveyCore {
    /// The number of options each question has, in question order.
    pub fn option_counts(&self) -> Vec<usize> {
        self.questions.iter().map(|q| q.options.len()).collect()
    }
}

/// A survey without an ID.
pub type NewSurvey = SurveyCore;

/// A survey from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub survey: SurveyCore,
}

impl Survey {
    /// Assign a fresh ID, ready for insertion.
    pub fn new(survey: NewSurvey) -> Self {
        Self {
            id: Id::new(),
            survey,
        }
    }
}

impl Deref for Survey {
    type Target = SurveyCore;

    fn deref(&self) -> &Self::Target {
        &self.survey
    }
}

impl DerefMut for Survey {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.survey
    }
}

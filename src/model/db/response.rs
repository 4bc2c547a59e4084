use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A poll response: the index of the chosen option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollChoice(pub u32);

/// A survey response: one option index per question, in question order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurveyAnswers(pub Vec<u32>);

impl AsRef<[u32]> for SurveyAnswers {
    fn as_ref(&self) -> &[u32] {
        &self.0
    }
}

/// Core response data, as stored in the database.
///
/// There is at most one of these per `(resource_id, user_id)`, enforced by a
/// unique index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCore<C> {
    pub resource_id: Id,
    pub user_id: Id,
    pub choice: C,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl<C> ResponseCore<C> {
    pub fn new(resource_id: Id, user_id: Id, choice: C, now: DateTime<Utc>) -> Self {
        Self {
            resource_id,
            user_id,
            choice,
            created_at: now,
        }
    }
}

/// A response without an ID.
pub type NewResponse<C> = ResponseCore<C>;

/// A response from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response<C> {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub response: ResponseCore<C>,
}

impl<C> Response<C> {
    /// Assign a fresh ID, ready for insertion.
    pub fn new(response: NewResponse<C>) -> Self {
        Self {
            id: Id::new(),
            response,
        }
    }
}

impl<C> Deref for Response<C> {
    type Target = ResponseCore<C>;

    fn deref(&self) -> &Self::Target {
        &self.response
    }
}

impl<C> DerefMut for Response<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.response
    }
}

use chrono::{DateTime, Utc};
use rocket::serde::json::Value;
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{
        id::ApiId,
        validation::{choice_index, trimmed, Violation, Violations},
    },
    common::{ResourceMetadata, ResourceStatus, TallyResult},
    db::{NewPoll, Poll, PollChoice, PollCore},
    mongodb::Id,
};

/// A poll specification, as submitted by a moderator or admin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSpec {
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub end_date: Option<DateTime<Utc>>,
}

impl PollSpec {
    /// Check every field, reporting all violations together.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), Vec<Violation>> {
        let mut violations = Violations::new();
        violations.check_metadata(&self.title, &self.description, self.end_date, now);
        violations.check_options("options", &self.options);
        violations.into_result()
    }

    /// Convert a validated spec into a poll ready for insertion.
    pub fn into_poll(self, created_by: Id, now: DateTime<Utc>) -> NewPoll {
        NewPoll {
            metadata: ResourceMetadata::new(
                self.title.trim().to_string(),
                self.description.trim().to_string(),
                created_by,
                self.end_date,
                now,
            ),
            options: trimmed(self.options),
        }
    }
}

/// An API-friendly poll description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDescription {
    pub id: ApiId,
    pub title: String,
    pub description: String,
    /// Effective status: closed once the end date has passed.
    pub status: ResourceStatus,
    pub created_by: ApiId,
    pub created_at: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub options: Vec<String>,
}

impl PollDescription {
    pub fn new(poll: Poll, now: DateTime<Utc>) -> Self {
        let status = poll.metadata.effective_status(now);
        let PollCore { metadata, options } = poll.poll;
        Self {
            id: poll.id.into(),
            title: metadata.title,
            description: metadata.description,
            status,
            created_by: metadata.created_by.into(),
            created_at: metadata.created_at,
            end_date: metadata.end_date,
            options,
        }
    }
}

/// A poll together with its live tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollView {
    pub resource: PollDescription,
    /// Response counts, aligned to `resource.options`.
    pub tally: Vec<u64>,
    pub total: u64,
}

impl PollView {
    pub fn new(poll: Poll, tally: TallyResult, now: DateTime<Utc>) -> Self {
        Self {
            resource: PollDescription::new(poll, now),
            tally: tally.counts,
            total: tally.total,
        }
    }
}

/// A request to respond to a poll.
///
/// The choice is kept as raw JSON so that anything other than a valid
/// option index is rejected with a message rather than a deserialisation error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollResponseRequest {
    pub choice: Option<Value>,
}

impl PollResponseRequest {
    /// The chosen option, if it is one of `poll`'s options.
    pub fn choice_for(&self, poll: &PollCore) -> Result<PollChoice, String> {
        let choice = self
            .choice
            .as_ref()
            .filter(|choice| !choice.is_null())
            .ok_or_else(|| "A choice is required".to_string())?;
        choice_index(choice, poll.options.len())
            .and_then(|index| u32::try_from(index).ok())
            .map(PollChoice)
            .ok_or_else(|| {
                format!(
                    "Choice {choice} is not an option: the poll has {} options, numbered from 0",
                    poll.options.len()
                )
            })
    }
}

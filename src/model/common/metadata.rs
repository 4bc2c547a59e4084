use chrono::{DateTime, Utc};
use mongodb::bson::{self, doc, serde_helpers::chrono_datetime_as_bson_datetime, Document};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::{optional_bson_datetime, Id};

use super::ResourceStatus;

/// The metadata every poll and survey carries, flattened into their documents.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ResourceMetadata {
    /// Unique (per kind) title.
    pub title: String,
    /// Free-form description, possibly empty.
    pub description: String,
    /// Stored status. See [`ResourceMetadata::effective_status`].
    pub status: ResourceStatus,
    /// The privileged user who created it.
    pub created_by: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    /// Responses are refused after this point.
    #[serde(default, with = "optional_bson_datetime")]
    pub end_date: Option<DateTime<Utc>>,
}

impl ResourceMetadata {
    /// Metadata for a freshly created, active resource.
    pub fn new(
        title: String,
        description: String,
        created_by: Id,
        end_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            title,
            description,
            status: ResourceStatus::Active,
            created_by,
            created_at: now,
            end_date,
        }
    }

    /// Whether the resource accepts responses at `now`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ResourceStatus::Active && self.end_date.map_or(true, |end| now < end)
    }

    /// The stored status, except that an active resource past its end date
    /// reports as closed.
    pub fn effective_status(&self, now: DateTime<Utc>) -> ResourceStatus {
        if self.is_open_at(now) {
            ResourceStatus::Active
        } else {
            ResourceStatus::Closed
        }
    }

    /// A filter matching resources whose effective status at `now` is `status`.
    /// `None` matches everything.
    pub fn status_filter(status: Option<ResourceStatus>, now: DateTime<Utc>) -> Document {
        let now = bson::DateTime::from_chrono(now);
        match status {
            None => doc! {},
            Some(ResourceStatus::Active) => doc! {
                "status": ResourceStatus::Active,
                "$or": [{"end_date": null}, {"end_date": {"$gt": now}}],
            },
            Some(ResourceStatus::Closed) => doc! {
                "$or": [{"status": ResourceStatus::Closed}, {"end_date": {"$lte": now}}],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn open_until_end_date() {
        let now = Utc::now();
        let mut metadata = ResourceMetadata::new(
            "Library hours".to_string(),
            String::new(),
            Id::new(),
            Some(now + Duration::hours(1)),
            now,
        );
        assert!(metadata.is_open_at(now));
        assert_eq!(metadata.effective_status(now), ResourceStatus::Active);

        let later = now + Duration::hours(2);
        assert!(!metadata.is_open_at(later));
        assert_eq!(metadata.effective_status(later), ResourceStatus::Closed);

        metadata.end_date = None;
        assert!(metadata.is_open_at(later));
    }

    #[test]
    fn closed_is_never_open() {
        let now = Utc::now();
        let mut metadata =
            ResourceMetadata::new("Canteen menu".to_string(), String::new(), Id::new(), None, now);
        metadata.status = ResourceStatus::Closed;
        assert!(!metadata.is_open_at(now));
        assert_eq!(metadata.effective_status(now), ResourceStatus::Closed);
    }

    #[test]
    fn unfiltered_listing_matches_everything() {
        assert!(ResourceMetadata::status_filter(None, Utc::now()).is_empty());
    }
}

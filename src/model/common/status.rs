use mongodb::bson::{to_bson, Bson};
use rocket::FromFormField;
use serde::{Deserialize, Serialize};

/// States in the poll/survey lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    /// Accepting responses, unless the end date has passed.
    #[field(value = "active")]
    Active,
    /// Closed by a moderator, or past its end date.
    #[field(value = "closed")]
    Closed,
}

impl From<ResourceStatus> for Bson {
    fn from(status: ResourceStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

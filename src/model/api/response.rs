use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::Response};

/// An API-friendly description of a recorded response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDescription<C> {
    pub id: ApiId,
    pub resource_id: ApiId,
    pub user_id: ApiId,
    pub choice: C,
    pub created_at: DateTime<Utc>,
}

impl<C> From<Response<C>> for ResponseDescription<C> {
    fn from(response: Response<C>) -> Self {
        Self {
            id: response.id.into(),
            resource_id: response.response.resource_id.into(),
            user_id: response.response.user_id.into(),
            choice: response.response.choice,
            created_at: response.response.created_at,
        }
    }
}

/// Whether the current user has responded to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespondedStatus {
    pub responded: bool,
}

use crate::model::{
    db::{Poll, Survey},
    mongodb::Id,
};

use super::ResourceMetadata;

/// Something users respond to: a poll or a survey.
pub trait Resource {
    /// Lowercase name of the kind, used in messages.
    const KIND: &'static str;

    fn id(&self) -> Id;

    fn metadata(&self) -> &ResourceMetadata;
}

impl Resource for Poll {
    const KIND: &'static str = "poll";

    fn id(&self) -> Id {
        self.id
    }

    fn metadata(&self) -> &ResourceMetadata {
        &self.poll.metadata
    }
}

impl Resource for Survey {
    const KIND: &'static str = "survey";

    fn id(&self) -> Id {
        self.id
    }

    fn metadata(&self) -> &ResourceMetadata {
        &self.survey.metadata
    }
}

//! Types shared between the DB and API representations.

mod metadata;
mod resource;
mod status;
pub mod tally;

pub use metadata::ResourceMetadata;
pub use resource::Resource;
pub use status::ResourceStatus;
pub use tally::TallyResult;

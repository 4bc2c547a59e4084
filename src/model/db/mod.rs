//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in a DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

mod poll;
mod response;
mod survey;
mod user;

pub use poll::{NewPoll, Poll, PollCore};
pub use response::{NewResponse, PollChoice, Response, ResponseCore, SurveyAnswers};
pub use survey::{NewSurvey, Question, Survey, SurveyCore};
pub use user::{ensure_admin_exists, NewUser, User, UserCore};

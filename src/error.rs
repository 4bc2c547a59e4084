use std::fmt::Display;

use argon2::Error as Argon2Error;
use jsonwebtoken::errors::Error as JwtError;
use log::{error, warn};
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{self, Responder, Response},
    serde::json::Json,
    Catcher, Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::api::validation::Violation;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Invalid request: {} violation(s)", .0.len())]
    Validation(Vec<Violation>),
}

impl Error {
    /// A [`Error::NotFound`] for the described thing.
    pub fn not_found(what: impl Display) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Unauthorized(_) | Self::Jwt(_) => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
            Self::NotFound(_) => Status::NotFound,
            Self::Conflict(_) | Self::BadRequest(_) | Self::Validation(_) => Status::BadRequest,
            Self::Db(_) | Self::Argon2(_) => Status::InternalServerError,
        }
    }

    /// The client-facing message.
    pub fn message(&self) -> String {
        match self {
            Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::BadRequest(msg) => msg.clone(),
            Self::Db(e) => e.to_string(),
            Self::Jwt(e) => e.to_string(),
            Self::Argon2(_) => "Internal server error".to_string(),
            Self::Validation(_) => "Invalid request".to_string(),
        }
    }

    /// The JSON body sent to the client.
    pub fn body(self) -> ErrorBody {
        let error = match self {
            Self::Validation(violations) => ErrorDetail::Violations(violations),
            other => ErrorDetail::Message(other.message()),
        };
        ErrorBody { error }
    }
}

/// The body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Violations(Vec<Violation>),
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            warn!("{self}");
        }
        Response::build_from(Json(self.body()).respond_to(req)?)
            .status(status)
            .ok()
    }
}

/// The reason a request guard failed, cached on the request so that the
/// catcher can report it.
#[derive(Debug, Default)]
pub struct GuardFailure(pub Option<String>);

/// Render every error Rocket produces outside a handler (unmatched routes,
/// failed guards, malformed bodies) in the same JSON shape as [`Error`].
#[catch(default)]
fn json_catcher(status: Status, req: &Request<'_>) -> (Status, Json<ErrorBody>) {
    let message = req
        .local_cache(GuardFailure::default)
        .0
        .clone()
        .unwrap_or_else(|| status.reason().unwrap_or("Unknown error").to_string());
    (
        status,
        Json(ErrorBody {
            error: ErrorDetail::Message(message),
        }),
    )
}

pub fn catchers() -> Vec<Catcher> {
    catchers![json_catcher]
}

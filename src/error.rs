use log::{debug, error};
use mongodb::{bson::de::Error as BsonError, error::Error as DbError};
use rocket::{http::Status, response::Responder};
use thiserror::Error;

use crate::model::common::QuestionId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Bson(#[from] BsonError),
    #[error("Storage failure: {0}")]
    Storage(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Invalid option '{0}', expected \"A\" or \"B\"")]
    InvalidOption(String),
    #[error("Already voted on question '{0}'")]
    AlreadyVoted(QuestionId),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] describing a question.
    pub fn question_not_found(id: &QuestionId) -> Self {
        Self::NotFound(format!("Question with ID '{id}'"))
    }

    /// The HTTP status this error is surfaced as.
    pub fn status(&self) -> Status {
        match self {
            Self::BadRequest(_) | Self::InvalidOption(_) => Status::BadRequest,
            Self::AlreadyVoted(_) => Status::Conflict,
            Self::NotFound(_) => Status::NotFound,
            Self::Db(_) | Self::Bson(_) | Self::Storage(_) => Status::InternalServerError,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            debug!("{self}");
        }
        Err(status)
    }
}

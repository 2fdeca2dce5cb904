use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::moderation::PersistError;
use crate::resolver::ResolveError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub msg: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Content-Type must be application/json")] UnsupportedContentType,
    #[error("Error decoding JSON body: {0}")] InvalidBody(String),
    #[error("Unable to read entry data: {0}")] EntryUnreadable(String),
    #[error("Unable to file comment: {0}")] MalformedThreadId(String),
    #[error("Thread is closed for new comments")] ThreadClosed,
    #[error("{0}")] Store(#[from] PersistError),
    #[error("internal error")] Internal,
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::MalformedThreadId(_) => ApiError::MalformedThreadId(e.to_string()),
            ResolveError::EntryNotFound(_) | ResolveError::EntryUnreadable(_) => ApiError::EntryUnreadable(e.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::UnsupportedContentType | ApiError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::EntryUnreadable(_) | ApiError::MalformedThreadId(_) => StatusCode::BAD_REQUEST,
            ApiError::ThreadClosed => StatusCode::UNAUTHORIZED,
            ApiError::Store(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        HttpResponse::build(status).json(ApiErrorBody { msg: self.to_string() })
    }
}

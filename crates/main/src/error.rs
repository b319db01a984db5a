use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the JSON API.
///
/// Clients only ever see a status code and a message: a bad body and an
/// unknown user are both reported as internal errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Error in body: {0}")]
    InvalidBody(String),
    #[error("User ID doesn't exist")]
    UnknownUser,
    #[error("Not found")]
    NotFound,
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::NotFound => Status::NotFound,
            ApiError::InvalidBody(_)
            | ApiError::UnknownUser
            | ApiError::Database(_) => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let message = match &self {
            ApiError::Database(e) => {
                tracing::error!("Database error while handling request: {e}");
                "Internal server error".to_string()
            }
            other => {
                tracing::warn!("Rejecting request: {other}");
                other.to_string()
            }
        };

        (self.status(), Json(ErrorBody { error: message })).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use rocket::http::Status;

    use super::ApiError;

    #[test]
    fn creation_failures_are_generic_server_errors() {
        assert_eq!(
            ApiError::InvalidBody("missing field `url`".into()).status(),
            Status::InternalServerError
        );
        assert_eq!(ApiError::UnknownUser.status(), Status::InternalServerError);
        assert_eq!(ApiError::NotFound.status(), Status::NotFound);
    }
}

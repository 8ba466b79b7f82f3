//! Receiver error type and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use responder::EventError;
use serde::Serialize;
use thiserror::Error;

/// Reasons a request could not be answered with a reply event.
#[derive(Debug, Error)]
pub enum ReceiveError {
    /// The request carried neither a structured-mode content type nor a
    /// `ce-specversion` header.
    #[error("Request is not a CloudEvent")]
    NotACloudEvent,

    /// Structured mode with an event format other than JSON, or batch mode.
    #[error("Unsupported event format '{content_type}'")]
    UnsupportedMediaType {
        /// The `Content-Type` received.
        content_type: String,
    },

    /// A header value was not valid ASCII or had a malformed percent escape.
    #[error("Invalid header '{name}'")]
    InvalidHeader {
        /// Header name.
        name: String,
    },

    /// The structured-mode body was not valid JSON.
    #[error("Malformed JSON body: {reason}")]
    MalformedJson {
        /// Parser message.
        reason: String,
    },

    /// The attributes did not form a valid event.
    #[error(transparent)]
    InvalidEvent(#[from] EventError),

    /// The reply could not be written into an HTTP response.
    #[error("Failed to encode reply: {reason}")]
    Encode {
        /// Description of the failure.
        reason: String,
    },
}

impl ReceiveError {
    /// HTTP status the error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Encode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotACloudEvent => "not_a_cloudevent",
            Self::UnsupportedMediaType { .. } => "unsupported_media_type",
            Self::InvalidHeader { .. } => "invalid_header",
            Self::MalformedJson { .. } => "malformed_json",
            Self::InvalidEvent(_) => "invalid_event",
            Self::Encode { .. } => "encode_failed",
        }
    }
}

/// Error body returned to the sender.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct Problem {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ReceiveError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Failed to reply");
        } else {
            tracing::warn!(error = %self, code = self.code(), "Rejected request");
        }

        let problem = Problem {
            code: self.code().to_owned(),
            message: self.to_string(),
        };
        (status, Json(problem)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ReceiveError::NotACloudEvent.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ReceiveError::UnsupportedMediaType {
                content_type: "application/cloudevents+xml".into()
            }
            .status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ReceiveError::from(EventError::MissingAttribute { name: "id" }).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_problem_body() {
        let response =
            ReceiveError::from(EventError::MissingAttribute { name: "id" }).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let problem: Problem = serde_json::from_slice(&body).unwrap();
        assert_eq!(problem.code, "invalid_event");
        assert_eq!(problem.message, "Missing required attribute 'id'");
    }
}

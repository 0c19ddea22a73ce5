use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::advisor::AdvisorError;
use crate::classifier::ClassifierError;
use crate::intake::IntakeError;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request-level failure. Every stage aborts the request on first error;
/// there is no partial-result path.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("invalid request body: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Advisor(#[from] AdvisorError),
}

impl ResponseError for AnalyzeError {
    fn status_code(&self) -> StatusCode {
        match self {
            AnalyzeError::BadRequest(_)
            | AnalyzeError::Intake(IntakeError::NoImage)
            | AnalyzeError::Intake(IntakeError::InvalidBase64(_)) => StatusCode::BAD_REQUEST,
            AnalyzeError::Intake(IntakeError::Io(_)) | AnalyzeError::Classifier(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AnalyzeError::Advisor(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        log::error!("analyze request failed: {}", self);
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn missing_image_is_a_client_error() {
        let err = AnalyzeError::from(IntakeError::NoImage);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "No image found");
    }

    #[test]
    fn malformed_json_is_a_client_error() {
        let err = AnalyzeError::BadRequest("invalid JSON body".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn classifier_failures_are_server_errors() {
        let err = AnalyzeError::from(ClassifierError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing upload",
        )));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn advisor_failures_are_gateway_errors() {
        let err = AnalyzeError::from(AdvisorError::Api {
            status: 401,
            message: "invalid api key".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[actix_web::test]
    async fn error_body_always_carries_an_error_field() {
        let err = AnalyzeError::from(IntakeError::NoImage);
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "No image found");
    }
}

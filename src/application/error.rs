use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{domain::error::DomainError, infra::error::InfraError};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// Failures that end a `dossier` command.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer failure")]
    struct Outer {
        #[source]
        inner: std::io::Error,
    }

    #[test]
    fn report_collects_source_chain() {
        let error = Outer {
            inner: std::io::Error::other("disk unplugged"),
        };
        let report = ErrorReport::from_error("tests", StatusCode::BAD_GATEWAY, &error);
        assert_eq!(report.messages, vec!["outer failure", "disk unplugged"]);
    }

    #[test]
    fn http_error_keeps_detail_out_of_the_body() {
        let error = Outer {
            inner: std::io::Error::other("template missing"),
        };
        let response = HttpError::from_error(
            "tests",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Template rendering failed",
            &error,
        )
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.messages, vec!["outer failure", "template missing"]);
    }

    #[test]
    fn app_error_displays_its_cause() {
        let error = AppError::from(InfraError::configuration("missing field `content`"));
        assert_eq!(
            error.to_string(),
            "configuration error: missing field `content`"
        );
        let error = AppError::from(DomainError::validation("resume owner must not be empty"));
        assert_eq!(
            error.to_string(),
            "domain validation failed: resume owner must not be empty"
        );
    }
}

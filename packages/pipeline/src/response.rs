//! Projection of a [`Resolution`] into a response.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION};
use http::StatusCode;

use cidchain_store::Format;

use crate::debug::PipelineTrace;
use crate::error::{ErrorKind, PipelineError};
use crate::resolver::{Mode, Output, Resolution};

const JSON_CONTENT_TYPE: &str = "application/json";
const ERROR_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// What a request should answer with.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    /// Inline content.
    Content {
        status: StatusCode,
        format: Format,
        body: Bytes,
    },
    /// Redirect to a stored result.
    Redirect { status: StatusCode, location: String },
    /// A debug trace, always JSON.
    Debug {
        status: StatusCode,
        body: serde_json::Value,
    },
    /// A failed resolution.
    Error {
        status: StatusCode,
        kind: ErrorKind,
        message: String,
    },
}

impl Response {
    pub fn from_resolution(resolution: Resolution) -> Self {
        match resolution.mode {
            Mode::Debug => Self::debug(&resolution.trace),
            Mode::Normal => match resolution.result {
                Ok(output) => output.into(),
                Err(error) => Self::error(&error),
            },
        }
    }

    pub fn debug(trace: &PipelineTrace) -> Self {
        Response::Debug {
            status: StatusCode::OK,
            body: trace.to_json(),
        }
    }

    pub fn error(error: &PipelineError) -> Self {
        Response::Error {
            status: error.status_code(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Response::Content { status, .. }
            | Response::Redirect { status, .. }
            | Response::Debug { status, .. }
            | Response::Error { status, .. } => *status,
        }
    }

    /// The `Content-Type` to send, if the response has a body.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Response::Content { format, .. } => Some(format.as_str()),
            Response::Debug { .. } => Some(JSON_CONTENT_TYPE),
            Response::Error { .. } => Some(ERROR_CONTENT_TYPE),
            Response::Redirect { .. } => None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Response::Redirect { location, .. } => Some(location.as_str()),
            _ => None,
        }
    }

    /// The response body.
    pub fn body(&self) -> Bytes {
        match self {
            Response::Content { body, .. } => body.clone(),
            Response::Debug { body, .. } => {
                Bytes::from(serde_json::to_vec_pretty(body).unwrap_or_default())
            }
            Response::Error { message, .. } => Bytes::from(message.clone()),
            Response::Redirect { .. } => Bytes::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Response::Error { .. })
    }

    /// Convert into an `http` response.
    pub fn into_http(self) -> Result<http::Response<Bytes>, http::Error> {
        let mut builder = http::Response::builder().status(self.status());
        if let Some(content_type) = self.content_type() {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(location) = self.location() {
            builder = builder.header(LOCATION, location);
        }
        builder.body(self.body())
    }
}

impl From<Output> for Response {
    fn from(output: Output) -> Self {
        match output {
            Output::Inline { body, format } => Response::Content {
                status: StatusCode::OK,
                format,
                body,
            },
            Output::Stored { cid } => Response::Redirect {
                status: StatusCode::FOUND,
                location: format!("/{}", cid),
            },
        }
    }
}

impl From<&PipelineError> for Response {
    fn from(error: &PipelineError) -> Self {
        Response::error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidchain_store::Cid;

    #[test]
    fn inline_content() {
        let response: Response = Output::Inline {
            body: Bytes::from_static(b"hi"),
            format: Format::TEXT,
        }
        .into();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content_type(), Some(Format::TEXT.as_str()));
        assert_eq!(&response.body()[..], b"hi");
    }

    #[test]
    fn stored_redirects() {
        let cid = Cid::for_content(&[0u8; 65]);
        let response: Response = Output::Stored { cid: cid.clone() }.into();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.location(), Some(format!("/{}", cid).as_str()));

        let http = response.into_http().unwrap();
        assert_eq!(http.status(), StatusCode::FOUND);
        assert_eq!(
            http.headers().get(LOCATION).unwrap(),
            format!("/{}", cid).as_str()
        );
    }

    #[test]
    fn errors_carry_kind_and_status() {
        let response = Response::error(&PipelineError::ChainRejected {
            name: "terminal-server".to_string(),
        });
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!response.is_success());
        match &response {
            Response::Error { kind, message, .. } => {
                assert_eq!(*kind, ErrorKind::ChainRejected);
                assert!(message.contains("cannot be used in a server chain"));
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[test]
    fn debug_is_json() {
        let trace = PipelineTrace {
            segments: Vec::new(),
            success: true,
            final_output: "x".to_string(),
        };
        let response = Response::debug(&trace);
        assert_eq!(response.content_type(), Some("application/json"));

        let http = response.into_http().unwrap();
        assert_eq!(http.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        let body: serde_json::Value = serde_json::from_slice(http.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"segments": [], "success": true, "final_output": "x"})
        );
    }
}

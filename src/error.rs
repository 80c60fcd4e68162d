use hyper::{
	header::{self, HeaderValue},
	Body, Response, StatusCode,
};
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Registration failures. All of them are raised while routes are being set up, never while serving.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
	#[error("invalid route pattern '{pattern}': {reason}")]
	InvalidPattern { pattern: String, reason: &'static str },

	#[error("invalid method '{0}'")]
	InvalidMethod(String),

	#[error("duplicate route '{method} {pattern}'")]
	DuplicateRoute { method: String, pattern: String },

	#[error("pattern '{pattern}' conflicts with an existing route: {reason}")]
	Conflict { pattern: String, reason: String },

	#[error("invalid group prefix '{prefix}': {reason}")]
	InvalidPrefix { prefix: String, reason: String },

	#[error("middleware can not be used as the main handler of route '{0}'")]
	MiddlewareAsHandler(String),

	#[error("controller type '{0}' is not registered")]
	UnregisteredController(&'static str),

	#[error("too many middlewares declared on one router")]
	SequenceExhausted,
}

impl Error {
	pub(crate) fn pattern(pattern: &str, reason: &'static str) -> Self {
		Error::InvalidPattern {
			pattern: pattern.to_owned(),
			reason,
		}
	}
}

/// The error outcomes of a dispatch. Each one can be given its own hook on the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
	NotFound,
	MethodNotAllowed,
	InternalError,
}

impl ErrorCode {
	pub fn status(self) -> StatusCode {
		match self {
			ErrorCode::NotFound => StatusCode::NOT_FOUND,
			ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
			ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn message(self) -> &'static str {
		match self {
			ErrorCode::NotFound => "404 route not found",
			ErrorCode::MethodNotAllowed => "405 method not allowed",
			ErrorCode::InternalError => "500 internal server error",
		}
	}

	/// The plain text response used when no hook is registered for this code.
	pub fn default_response(self) -> Response<Body> {
		let mut res = Response::new(Body::from(format!("{}\n", self.message())));
		*res.status_mut() = self.status();
		let headers = res.headers_mut();
		headers.insert(
			header::CONTENT_TYPE,
			HeaderValue::from_static("text/plain; charset=utf-8"),
		);
		headers.insert(
			header::X_CONTENT_TYPE_OPTIONS,
			HeaderValue::from_static("nosniff"),
		);
		res
	}
}

impl Display for ErrorCode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.message())
	}
}

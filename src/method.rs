use crate::Error;
use hyper::Method;
use std::{
	fmt::{self, Display, Formatter},
	str::FromStr,
};

/// The methods a route can be registered for. `Any` matches every request method but is only consulted
/// when no route is registered for the exact one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMethod {
	Any,
	Get,
	Post,
	Put,
	Delete,
	Options,
	Head,
	Patch,
	Connect,
	Trace,
}

impl RouteMethod {
	pub const ALL: [RouteMethod; 10] = [
		RouteMethod::Any,
		RouteMethod::Get,
		RouteMethod::Post,
		RouteMethod::Put,
		RouteMethod::Delete,
		RouteMethod::Options,
		RouteMethod::Head,
		RouteMethod::Patch,
		RouteMethod::Connect,
		RouteMethod::Trace,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			RouteMethod::Any => "*",
			RouteMethod::Get => "GET",
			RouteMethod::Post => "POST",
			RouteMethod::Put => "PUT",
			RouteMethod::Delete => "DELETE",
			RouteMethod::Options => "OPTIONS",
			RouteMethod::Head => "HEAD",
			RouteMethod::Patch => "PATCH",
			RouteMethod::Connect => "CONNECT",
			RouteMethod::Trace => "TRACE",
		}
	}

	/// The exact route method for a request method, `None` for extension methods.
	pub fn of(method: &Method) -> Option<Self> {
		RouteMethod::ALL[1..]
			.iter()
			.copied()
			.find(|route| route.as_str() == method.as_str())
	}
}

impl FromStr for RouteMethod {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let upper = s.to_ascii_uppercase();
		RouteMethod::ALL
			.iter()
			.copied()
			.find(|method| method.as_str() == upper)
			.ok_or_else(|| Error::InvalidMethod(s.to_owned()))
	}
}

impl Display for RouteMethod {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

use crate::Params;
use hyper::{Body, Request, Response};
use std::{any::Any, collections::HashMap};

/// Everything a handler chain works on for one request. Never shared between requests.
pub struct Context {
	pub request: Request<Body>,
	pub response: Response<Body>,
	pub params: Params,
	data: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Context {
	pub fn new(request: Request<Body>) -> Self {
		Self {
			request,
			response: Response::new(Body::empty()),
			params: Params::new(),
			data: HashMap::new(),
		}
	}

	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name).map(String::as_str)
	}

	/// Stores a value for later entries in the chain.
	pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
		self.data.insert(key.into(), Box::new(value));
	}

	pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
		self.data.get(key)?.downcast_ref()
	}

	pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
		let value = self.data.remove(key)?;
		value.downcast().ok().map(|value: Box<T>| *value)
	}

	pub fn into_response(self) -> Response<Body> {
		self.response
	}
}

#[cfg(test)]
mod test {
	use super::Context;
	use hyper::{Body, Request};

	#[test]
	fn typed_data() {
		let mut ctx = Context::new(Request::new(Body::empty()));
		ctx.insert("user", String::from("bob"));
		ctx.insert("id", 7_u32);

		assert_eq!(ctx.get::<String>("user").map(String::as_str), Some("bob"));
		assert_eq!(ctx.get::<u64>("id"), None);
		assert_eq!(ctx.remove::<u32>("id"), Some(7));
		assert_eq!(ctx.get::<u32>("id"), None);
	}
}

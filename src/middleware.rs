use crate::Context;
use anyhow::Result;
use std::{
	fmt::{self, Debug, Formatter},
	sync::Arc,
};

/// Code that runs around a route's main handler.
///
/// The instance attached to a route is a template: every request that reaches it runs on a fresh clone,
/// so fields may be mutated freely inside `handle`. Returning `Ok(false)` stops the chain.
pub trait Middleware: BoxClone + Send + Sync + 'static {
	fn handle(&mut self, ctx: &mut Context) -> Result<bool>;

	/// Priority used when the middleware is attached without an explicit one. Higher runs earlier;
	/// negative priorities run after the main handler.
	fn priority(&self) -> i16 {
		0
	}
}

pub trait BoxClone {
	fn box_clone(&self) -> Box<dyn Middleware>;
}

impl<T: Middleware + Clone> BoxClone for T {
	fn box_clone(&self) -> Box<dyn Middleware> {
		Box::new(self.clone())
	}
}

/// A middleware instance that can be attached to any number of routes and groups.
///
/// Clones refer to the same instance, so they share one declaration sequence number.
#[derive(Clone)]
pub struct SharedMiddleware(Arc<dyn Middleware>);

impl SharedMiddleware {
	pub fn new<M: Middleware>(middleware: M) -> Self {
		Self(Arc::new(middleware))
	}

	pub(crate) fn id(&self) -> usize {
		Arc::as_ptr(&self.0) as *const () as usize
	}

	pub fn priority(&self) -> i16 {
		self.0.priority()
	}

	/// A fresh copy for one request.
	pub(crate) fn instance(&self) -> Box<dyn Middleware> {
		self.0.box_clone()
	}
}

impl<M: Middleware> From<M> for SharedMiddleware {
	fn from(middleware: M) -> Self {
		Self::new(middleware)
	}
}

impl Debug for SharedMiddleware {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SharedMiddleware").field(&self.id()).finish()
	}
}

/// Middleware made from a closure.
#[derive(Clone)]
pub struct FnMiddleware<F> {
	f: F,
	priority: i16,
}

impl<F> FnMiddleware<F> {
	pub fn with_priority(mut self, priority: i16) -> Self {
		self.priority = priority;
		self
	}
}

impl<F> Middleware for FnMiddleware<F>
where
	F: Fn(&mut Context) -> Result<bool> + Clone + Send + Sync + 'static,
{
	fn handle(&mut self, ctx: &mut Context) -> Result<bool> {
		(self.f)(ctx)
	}

	fn priority(&self) -> i16 {
		self.priority
	}
}

pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
	F: Fn(&mut Context) -> Result<bool> + Clone + Send + Sync + 'static,
{
	FnMiddleware { f, priority: 0 }
}

#[cfg(test)]
mod test {
	use super::{from_fn, Middleware, SharedMiddleware};
	use crate::Context;
	use anyhow::Result;
	use hyper::{Body, Request};

	#[derive(Clone, Default)]
	struct Counter {
		hits: usize,
	}

	impl Middleware for Counter {
		fn handle(&mut self, ctx: &mut Context) -> Result<bool> {
			self.hits += 1;
			ctx.insert("hits", self.hits);
			Ok(true)
		}
	}

	#[test]
	fn instances_are_independent() {
		let shared = SharedMiddleware::new(Counter::default());

		for _ in 0..3 {
			let mut ctx = Context::new(Request::new(Body::empty()));
			assert!(shared.instance().handle(&mut ctx).unwrap());
			assert_eq!(ctx.get::<usize>("hits"), Some(&1));
		}
	}

	#[test]
	fn clones_share_identity() {
		let a = SharedMiddleware::new(Counter::default());
		let b = a.clone();
		let c = SharedMiddleware::new(Counter::default());
		assert_eq!(a.id(), b.id());
		assert_ne!(a.id(), c.id());
	}

	#[test]
	fn closures() {
		let stop = SharedMiddleware::from(from_fn(|_: &mut Context| Ok(false)).with_priority(-3));
		assert_eq!(stop.priority(), -3);

		let mut ctx = Context::new(Request::new(Body::empty()));
		assert!(!stop.instance().handle(&mut ctx).unwrap());
	}
}

use crate::{controller::Controllers, Context, Controller, Error, OrderKey, SharedMiddleware};
use anyhow::Result;
use hyper::{Body, Request, Response};
use std::{
	any::type_name,
	fmt::{self, Debug, Formatter},
	sync::Arc,
};

pub type NativeFn = dyn Fn(&Request<Body>) -> Result<Response<Body>> + Send + Sync;
pub type HandlerFn = dyn Fn(&mut Context) -> Result<()> + Send + Sync;
type Resolver = dyn Fn(&Controllers) -> Result<Arc<HandlerFn>, Error> + Send + Sync;

/// A controller method waiting for the router's controller registry. Built by [`Handler::action`].
#[derive(Clone)]
pub struct ControllerAction(Arc<Resolver>);

impl ControllerAction {
	fn resolve(&self, controllers: &Controllers) -> Result<Arc<HandlerFn>, Error> {
		(self.0)(controllers)
	}
}

impl Debug for ControllerAction {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str("ControllerAction")
	}
}

/// Anything that can be registered on a route.
///
/// The kind is decided here, once, when the handler is built; routes store the resolved form.
#[derive(Clone)]
pub enum Handler {
	/// Works on the bare hyper request and produces the whole response.
	Native(Arc<NativeFn>),
	/// Works on the request [`Context`].
	Func(Arc<HandlerFn>),
	/// A [`Controller`] method, looked up in the router's controller registry when the route is added.
	Action(ControllerAction),
	/// Only valid through `use_middleware`; a route's main handler can not be a middleware.
	Middleware(SharedMiddleware),
}

impl Handler {
	pub fn native<F>(f: F) -> Self
	where
		F: Fn(&Request<Body>) -> Result<Response<Body>> + Send + Sync + 'static,
	{
		Handler::Native(Arc::new(f))
	}

	pub fn func<F>(f: F) -> Self
	where
		F: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
	{
		Handler::Func(Arc::new(f))
	}

	pub fn action<C, F>(method: F) -> Self
	where
		C: Controller,
		F: Fn(&mut C, &mut Context) -> Result<()> + Send + Sync + 'static,
	{
		let method = Arc::new(method);
		Handler::Action(ControllerAction(Arc::new(move |controllers: &Controllers| {
			let prototype = controllers
				.prototype::<C>()
				.ok_or_else(|| Error::UnregisteredController(type_name::<C>()))?;
			let method = Arc::clone(&method);

			let action: Arc<HandlerFn> = Arc::new(move |ctx: &mut Context| {
				let mut controller = C::clone(&prototype);
				controller.initialize(ctx);
				let result = method(&mut controller, ctx);
				controller.finalize(ctx);
				result
			});
			Ok(action)
		})))
	}

	pub fn middleware(middleware: impl Into<SharedMiddleware>) -> Self {
		Handler::Middleware(middleware.into())
	}

	pub(crate) fn resolve(&self, controllers: &Controllers) -> Result<Callable, Error> {
		Ok(match self {
			Handler::Native(f) => Callable::Native(Arc::clone(f)),
			Handler::Func(f) => Callable::Func(Arc::clone(f)),
			Handler::Action(action) => Callable::Action(action.resolve(controllers)?),
			Handler::Middleware(m) => Callable::Middleware(m.clone()),
		})
	}
}

impl From<SharedMiddleware> for Handler {
	fn from(middleware: SharedMiddleware) -> Self {
		Handler::Middleware(middleware)
	}
}

impl Debug for Handler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let kind = match self {
			Handler::Native(_) => "Native",
			Handler::Func(_) => "Func",
			Handler::Action(_) => "Action",
			Handler::Middleware(_) => "Middleware",
		};
		write!(f, "Handler::{}", kind)
	}
}

#[derive(Clone)]
pub(crate) enum Callable {
	Native(Arc<NativeFn>),
	Func(Arc<HandlerFn>),
	Action(Arc<HandlerFn>),
	Middleware(SharedMiddleware),
}

impl Callable {
	pub fn is_middleware(&self) -> bool {
		matches!(self, Callable::Middleware(_))
	}
}

/// One resolved entry of a route's chain.
#[derive(Clone)]
pub(crate) struct ChainEntry {
	pub key: OrderKey,
	callable: Callable,
}

impl ChainEntry {
	pub fn handler(callable: Callable) -> Self {
		Self {
			key: OrderKey::HANDLER,
			callable,
		}
	}

	pub fn middleware(middleware: SharedMiddleware, key: OrderKey) -> Self {
		Self {
			key,
			callable: Callable::Middleware(middleware),
		}
	}

	/// Runs the entry and reports whether the chain should go on.
	pub fn call(&self, ctx: &mut Context) -> Result<bool> {
		match &self.callable {
			Callable::Native(f) => {
				ctx.response = f(&ctx.request)?;
				Ok(true)
			}
			Callable::Func(f) | Callable::Action(f) => {
				f(ctx)?;
				Ok(true)
			}
			Callable::Middleware(m) => m.instance().handle(ctx),
		}
	}
}

//! A prefix-trie HTTP router built on hyper.
//!
//! ```no_run
//! use trellis::{
//! 	from_fn, hyper::{Body, Response, Server}, Context, Handler, HttpRouter, Router, Scope,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! 	let mut router = Router::new();
//! 	router.use_middleware(from_fn(|ctx: &mut Context| {
//! 		ctx.insert("greeting", "hello");
//! 		Ok(true)
//! 	}))?;
//! 	router.get(
//! 		"/user/:name",
//! 		Handler::func(|ctx| {
//! 			let greeting = ctx.get::<&str>("greeting").copied().unwrap_or_default();
//! 			let body = format!("{} {}", greeting, ctx.param("name").unwrap_or_default());
//! 			ctx.response = Response::new(Body::from(body));
//! 			Ok(())
//! 		}),
//! 	)?;
//!
//! 	let addr = ([127, 0, 0, 1], 3000).into();
//! 	let server = Server::bind(&addr).serve(HttpRouter::from(router));
//! 	server.await?;
//! 	Ok(())
//! }
//! ```
//!
//! Patterns are made of static text and `:name` segments. A `:name` segment captures one non-empty path
//! segment; static text always wins over a parameter at the same position, and the longest match wins
//! overall. A static pattern also matches paths that continue past it at a `/`, so `/static` serves
//! `/static/app.js` when nothing longer matches.
//!
//! Requests for a path that only lacks a trailing slash, or that is not in canonical form, are redirected
//! with `307 Temporary Redirect`.
//!
//! Middleware runs in priority order: higher priorities first, negative priorities after the main
//! handler. Middlewares with equal priority run in the order they were first attached anywhere on the
//! router. Each request runs on its own clone of every middleware instance.

mod binding;
mod context;
mod controller;
mod error;
mod fault;
mod group;
mod handler;
mod method;
mod middleware;
mod order;
mod path;
mod pattern;
mod route;
mod router;
mod tree;

#[cfg(feature = "http")]
mod http;
#[cfg(feature = "http")]
pub use http::*;

pub use hyper;

pub use binding::{Binding, RouteSet};
pub use context::Context;
pub use controller::Controller;
pub use error::{Error, ErrorCode};
pub use group::{Group, Route, Scope};
pub use handler::{ControllerAction, Handler, HandlerFn, NativeFn};
pub use method::RouteMethod;
pub use middleware::{from_fn, BoxClone, FnMiddleware, Middleware, SharedMiddleware};
pub use order::{OrderKey, Sequencer};
pub use path::{clean_path, strip_host_port};
pub use pattern::PatternMap;
pub use route::{RouteId, RouteInfo, RouteList, RouteRecord};
pub use router::{ErrorHook, GroupId, Resolution, Router};
pub use tree::{Match, Params, PatternTree};

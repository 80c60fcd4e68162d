use crate::{
	binding::{Binding, RouteSet},
	controller::Controllers,
	fault,
	handler::ChainEntry,
	order::Sequencer,
	path::{clean_path, strip_host_port},
	Context, Controller, Error, ErrorCode, Group, Handler, OrderKey, Params, PatternMap, RouteId,
	RouteList, RouteMethod, RouteRecord, SharedMiddleware,
};
use hyper::{
	header::{self, HeaderValue},
	Body, Method, Request, Response, StatusCode, Uri, Version,
};
use std::{collections::HashMap, fmt::Write, sync::Arc};
use tracing::{debug, error, trace};

/// Called instead of the default text response for an [`ErrorCode`]. The response status is already set.
pub type ErrorHook = dyn Fn(&mut Context) + Send + Sync;

/// Index of a route group inside its router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

impl GroupId {
	pub const ROOT: GroupId = GroupId(0);
}

#[derive(Default)]
pub(crate) struct GroupData {
	parent: Option<GroupId>,
	prefix: String,
	routes: Vec<RouteId>,
	subgroups: Vec<GroupId>,
	middlewares: Vec<SharedMiddleware>,
}

/// What the router decided to do with a request.
#[derive(Debug)]
pub enum Resolution<'a> {
	Route {
		route: &'a RouteRecord,
		params: Params,
	},
	/// Redirect to this path; the request's scheme, host and query are kept.
	Redirect(String),
	/// The path matched when the code is [`ErrorCode::MethodNotAllowed`], so its params are kept.
	Error(ErrorCode, Params),
}

/// The routing table and everything needed to serve it.
///
/// Routes, groups and middleware are registered through [`Scope`](crate::Scope), which `Router`
/// implements for its root group. Registration happens before serving; dispatch only reads.
pub struct Router {
	patterns: PatternMap<RouteSet>,
	pub(crate) routes: Vec<RouteRecord>,
	groups: Vec<GroupData>,
	sequencer: Sequencer,
	// keyed by instance address; holding the instance keeps the address unique
	declared: HashMap<usize, (SharedMiddleware, OrderKey)>,
	controllers: Controllers,
	error_hooks: HashMap<ErrorCode, Arc<ErrorHook>>,
}

impl Default for Router {
	fn default() -> Self {
		Self {
			patterns: PatternMap::new(),
			routes: Vec::new(),
			groups: vec![GroupData::default()],
			sequencer: Sequencer::default(),
			declared: HashMap::new(),
			controllers: Controllers::default(),
			error_hooks: HashMap::new(),
		}
	}
}

impl Router {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes `C` available to [`Handler::action`]. Must happen before routes using it are added.
	pub fn register_controller<C: Controller>(&mut self, prototype: C) -> &mut Self {
		self.controllers.register(prototype);
		self
	}

	pub fn handle_error<F>(&mut self, code: ErrorCode, hook: F) -> &mut Self
	where
		F: Fn(&mut Context) + Send + Sync + 'static,
	{
		self.error_hooks.insert(code, Arc::new(hook));
		self
	}

	/// Borrows a group created earlier, to add routes or middleware to it again.
	pub fn group_mut(&mut self, id: GroupId) -> Option<Group<'_>> {
		if id.0 < self.groups.len() {
			Some(Group::new(self, id))
		} else {
			None
		}
	}

	pub fn route(&self, id: RouteId) -> Option<&RouteRecord> {
		self.routes.get(id.0)
	}

	/// Every registered route, sorted by host, pattern and method.
	pub fn routes(&self) -> RouteList {
		RouteList::new(self.routes.iter().map(RouteRecord::info).collect())
	}

	pub fn patterns(&self) -> &PatternMap<RouteSet> {
		&self.patterns
	}

	pub fn len(&self) -> usize {
		self.routes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}

	pub(crate) fn group_prefix(&self, group: GroupId) -> &str {
		&self.groups[group.0].prefix
	}

	fn joined_prefix(&self, parent: Option<GroupId>, prefix: &str) -> Result<String, Error> {
		let parent = parent.map_or("", |parent| self.group_prefix(parent));
		if parent.ends_with('/') && prefix.starts_with('/') {
			return Err(Error::InvalidPrefix {
				prefix: prefix.to_owned(),
				reason: format!("joined to '{}' it forms an invalid path", parent),
			});
		}
		Ok(format!("{}{}", parent, prefix))
	}

	pub(crate) fn set_group_prefix(&mut self, group: GroupId, prefix: &str) -> Result<(), Error> {
		let data = &self.groups[group.0];
		let reason = if !data.routes.is_empty() {
			Some("prefix should be set before adding routes")
		} else if !data.subgroups.is_empty() {
			Some("prefix should be set before adding sub groups")
		} else {
			None
		};
		if let Some(reason) = reason {
			return Err(Error::InvalidPrefix {
				prefix: prefix.to_owned(),
				reason: reason.to_owned(),
			});
		}

		let prefix = self.joined_prefix(data.parent, prefix)?;
		self.groups[group.0].prefix = prefix;
		Ok(())
	}

	/// Creates a subgroup that starts out with every middleware of its parent.
	pub(crate) fn add_group(&mut self, parent: GroupId, prefix: &str) -> Result<GroupId, Error> {
		let prefix = self.joined_prefix(Some(parent), prefix)?;
		let id = GroupId(self.groups.len());
		self.groups.push(GroupData {
			parent: Some(parent),
			prefix,
			..GroupData::default()
		});

		for middleware in self.groups[parent.0].middlewares.clone() {
			self.use_on_group(id, &middleware, None)?;
		}
		self.groups[parent.0].subgroups.push(id);
		Ok(id)
	}

	/// Adds a route to `group`, prefixing the pattern and attaching the group's middleware.
	pub(crate) fn register(
		&mut self,
		group: GroupId,
		method: &str,
		pattern: &str,
		handler: Handler,
	) -> Result<RouteId, Error> {
		let pattern = format!("{}{}", self.group_prefix(group), pattern);
		let id = self.add_route(method, &pattern, handler)?;

		for middleware in self.groups[group.0].middlewares.clone() {
			self.use_on_route(id, &middleware, None)?;
		}
		self.groups[group.0].routes.push(id);
		Ok(id)
	}

	fn add_route(&mut self, method: &str, pattern: &str, handler: Handler) -> Result<RouteId, Error> {
		let method: RouteMethod = method.parse()?;
		if pattern.is_empty() {
			return Err(Error::pattern(pattern, "route pattern can not be empty"));
		}
		let (host, path) = split_host(pattern)?;

		let handler = handler.resolve(&self.controllers)?;
		if handler.is_middleware() {
			return Err(Error::MiddlewareAsHandler(pattern.to_owned()));
		}

		if self
			.patterns
			.get(path)
			.map_or(false, |set| set.contains(host, method))
		{
			return Err(Error::DuplicateRoute {
				method: method.to_string(),
				pattern: pattern.to_owned(),
			});
		}

		let id = RouteId(self.routes.len());
		self.patterns
			.get_or_insert_with(path, RouteSet::default)?
			.insert(host, method, id);
		self.routes.push(RouteRecord::new(host, method, path, handler));

		debug!(%method, host, pattern = path, "route added");
		Ok(id)
	}

	/// Returns the order key of a middleware, assigning its sequence number on first use.
	fn declare(&mut self, middleware: &SharedMiddleware, priority: Option<i16>) -> Result<OrderKey, Error> {
		if let Some((_, key)) = self.declared.get(&middleware.id()) {
			return Ok(*key);
		}

		let sequence = self.sequencer.next()?;
		let priority = priority.unwrap_or_else(|| middleware.priority());
		let key = OrderKey::new(priority, sequence);
		self.declared.insert(middleware.id(), (middleware.clone(), key));

		debug!(sequence, priority, key = key.get(), "middleware declared");
		Ok(key)
	}

	pub(crate) fn use_on_route(
		&mut self,
		route: RouteId,
		middleware: &SharedMiddleware,
		priority: Option<i16>,
	) -> Result<(), Error> {
		let key = self.declare(middleware, priority)?;
		self.routes[route.0].insert(ChainEntry::middleware(middleware.clone(), key));
		Ok(())
	}

	/// Attaches to every route of the group and its subgroups, and to every route added to them later.
	pub(crate) fn use_on_group(
		&mut self,
		group: GroupId,
		middleware: &SharedMiddleware,
		priority: Option<i16>,
	) -> Result<(), Error> {
		let key = self.declare(middleware, priority)?;

		for route in self.groups[group.0].routes.clone() {
			self.routes[route.0].insert(ChainEntry::middleware(middleware.clone(), key));
		}
		for subgroup in self.groups[group.0].subgroups.clone() {
			self.use_on_group(subgroup, middleware, None)?;
		}
		self.groups[group.0].middlewares.push(middleware.clone());
		Ok(())
	}

	/// Decides how a request is served without running anything.
	///
	/// The path is cleaned and the host stripped of its port, except for `CONNECT` requests.
	pub fn resolve(&self, method: &Method, host: &str, path: &str) -> Resolution<'_> {
		let (host, clean) = if *method == Method::CONNECT {
			(host, path.to_owned())
		} else {
			(strip_host_port(host), clean_path(path))
		};

		let found = match self.patterns.find(&clean) {
			Some(found) => found,
			None => return Resolution::Error(ErrorCode::NotFound, Params::new()),
		};

		if found.redirect {
			return Resolution::Redirect(format!("{}/", clean));
		}
		if clean != path {
			return Resolution::Redirect(clean);
		}

		match found.value.resolve(host, RouteMethod::of(method)) {
			Binding::Found(route) => Resolution::Route {
				route: &self.routes[route.0],
				params: found.params,
			},
			Binding::MethodNotAllowed => Resolution::Error(ErrorCode::MethodNotAllowed, found.params),
			Binding::NotFound => Resolution::Error(ErrorCode::NotFound, Params::new()),
		}
	}

	/// Serves one request: runs the matched route's chain, redirects, or reports an error.
	pub fn dispatch(&self, request: Request<Body>) -> Response<Body> {
		if request.uri().scheme().is_none() && request.uri().path() == "*" {
			return bad_request(&request);
		}

		let host = request_host(&request);
		let mut ctx = Context::new(request);

		match self.resolve(ctx.request.method(), &host, ctx.request.uri().path()) {
			Resolution::Route { route, params } => {
				ctx.params = params;
				self.run(route, &mut ctx);
			}
			Resolution::Redirect(path) => {
				trace!(location = %path, "redirect");
				match redirect(ctx.request.uri(), &path) {
					Ok(response) => ctx.response = response,
					Err(err) => {
						error!(error = %err, "invalid redirect location");
						self.report(ErrorCode::InternalError, &mut ctx);
					}
				}
			}
			Resolution::Error(code, params) => {
				ctx.params = params;
				self.report(code, &mut ctx);
			}
		}

		ctx.into_response()
	}

	fn run(&self, route: &RouteRecord, ctx: &mut Context) {
		match fault::catch(|| route.run(ctx)) {
			Ok(Ok(())) => return,
			Ok(Err(err)) => error!(
				method = %route.method(),
				pattern = route.pattern(),
				error = ?err,
				"handler failed"
			),
			Err(fault) => error!(
				method = %route.method(),
				pattern = route.pattern(),
				panic = %fault,
				backtrace = %fault.backtrace,
				"handler panicked"
			),
		}

		ctx.response = Response::new(Body::empty());
		self.report(ErrorCode::InternalError, ctx);
	}

	/// Runs the hook for `code`, or writes the default response. A panicking hook falls back to the
	/// internal error path, and a panicking internal error hook to the default 500 response.
	fn report(&self, code: ErrorCode, ctx: &mut Context) {
		trace!(status = %code.status(), path = ctx.request.uri().path(), "dispatch error");

		let hook = match self.error_hooks.get(&code) {
			Some(hook) => hook,
			None => {
				ctx.response = code.default_response();
				return;
			}
		};

		ctx.response = Response::new(Body::empty());
		*ctx.response.status_mut() = code.status();
		if let Err(fault) = fault::catch(|| hook(ctx)) {
			error!(
				status = %code.status(),
				panic = %fault,
				backtrace = %fault.backtrace,
				"error hook panicked"
			);
			match code {
				ErrorCode::InternalError => ctx.response = code.default_response(),
				_ => self.report(ErrorCode::InternalError, ctx),
			}
		}
	}
}

/// Splits `host/path` patterns. Patterns starting with `/` bind any host.
fn split_host(pattern: &str) -> Result<(&str, &str), Error> {
	if pattern.starts_with('/') {
		return Ok(("", pattern));
	}
	match pattern.find('/') {
		Some(at) => Ok(pattern.split_at(at)),
		None => Err(Error::pattern(
			pattern,
			"a host must be followed by a path, as in host/path",
		)),
	}
}

fn request_host(request: &Request<Body>) -> String {
	request
		.uri()
		.authority()
		.map(|authority| authority.as_str())
		.or_else(|| {
			request
				.headers()
				.get(header::HOST)
				.and_then(|host| host.to_str().ok())
		})
		.unwrap_or_default()
		.to_owned()
}

fn redirect(uri: &Uri, path: &str) -> Result<Response<Body>, hyper::http::Error> {
	let mut location = String::new();
	if let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) {
		let _ = write!(location, "{}://{}", scheme, authority);
	}
	location.push_str(path);
	if let Some(query) = uri.query() {
		location.push('?');
		location.push_str(query);
	}

	Response::builder()
		.status(StatusCode::TEMPORARY_REDIRECT)
		.header(header::LOCATION, location)
		.body(Body::empty())
}

fn bad_request(request: &Request<Body>) -> Response<Body> {
	let mut response = Response::new(Body::empty());
	*response.status_mut() = StatusCode::BAD_REQUEST;
	if request.version() != Version::HTTP_09 && request.version() != Version::HTTP_10 {
		response
			.headers_mut()
			.insert(header::CONNECTION, HeaderValue::from_static("close"));
	}
	response
}

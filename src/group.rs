use crate::{router::GroupId, Error, Handler, RouteId, RouteRecord, Router, SharedMiddleware};
use std::fmt::{self, Debug, Formatter};

/// Registration surface shared by the [`Router`] (its root group) and every [`Group`].
///
/// Routes get the group prefix prepended to their pattern and the group's middleware attached.
/// Middleware attached to a group later still reaches routes and subgroups that already exist.
pub trait Scope {
	#[doc(hidden)]
	fn router(&self) -> &Router;

	#[doc(hidden)]
	fn router_mut(&mut self) -> &mut Router;

	fn group_id(&self) -> GroupId;

	/// Adds a route. `method` is an HTTP method name or `*` for any method. The pattern may start with
	/// a host, as in `example.com/user/:name`.
	fn handle(&mut self, method: &str, pattern: &str, handler: Handler) -> Result<Route<'_>, Error> {
		let group = self.group_id();
		let router = self.router_mut();
		let id = router.register(group, method, pattern, handler)?;
		Ok(Route { router, id })
	}

	fn get(&mut self, pattern: &str, handler: Handler) -> Result<Route<'_>, Error> {
		self.handle("GET", pattern, handler)
	}

	fn post(&mut self, pattern: &str, handler: Handler) -> Result<Route<'_>, Error> {
		self.handle("POST", pattern, handler)
	}

	fn put(&mut self, pattern: &str, handler: Handler) -> Result<Route<'_>, Error> {
		self.handle("PUT", pattern, handler)
	}

	fn delete(&mut self, pattern: &str, handler: Handler) -> Result<Route<'_>, Error> {
		self.handle("DELETE", pattern, handler)
	}

	fn options(&mut self, pattern: &str, handler: Handler) -> Result<Route<'_>, Error> {
		self.handle("OPTIONS", pattern, handler)
	}

	fn head(&mut self, pattern: &str, handler: Handler) -> Result<Route<'_>, Error> {
		self.handle("HEAD", pattern, handler)
	}

	fn patch(&mut self, pattern: &str, handler: Handler) -> Result<Route<'_>, Error> {
		self.handle("PATCH", pattern, handler)
	}

	/// Serves every method that has no route of its own on the pattern.
	fn any(&mut self, pattern: &str, handler: Handler) -> Result<Route<'_>, Error> {
		self.handle("*", pattern, handler)
	}

	/// Adds one route per method, grouped so middleware can be attached to all of them at once.
	fn some(&mut self, methods: &[&str], pattern: &str, handler: Handler) -> Result<Group<'_>, Error> {
		self.group_with("", |group| {
			for method in methods {
				group.handle(method, pattern, handler.clone())?;
			}
			Ok(())
		})
	}

	/// Creates a subgroup. Its prefix is appended to this group's prefix; joining two slashes is an error.
	fn group(&mut self, prefix: &str) -> Result<Group<'_>, Error> {
		let parent = self.group_id();
		let router = self.router_mut();
		let id = router.add_group(parent, prefix)?;
		Ok(Group { router, id })
	}

	fn group_with<F>(&mut self, prefix: &str, build: F) -> Result<Group<'_>, Error>
	where
		F: FnOnce(&mut Group<'_>) -> Result<(), Error>,
	{
		let mut group = self.group(prefix)?;
		build(&mut group)?;
		Ok(group)
	}

	fn use_middleware(&mut self, middleware: impl Into<SharedMiddleware>) -> Result<&mut Self, Error> {
		let group = self.group_id();
		self.router_mut().use_on_group(group, &middleware.into(), None)?;
		Ok(self)
	}

	/// Like [`Scope::use_middleware`], overriding the middleware's own priority.
	fn use_middleware_at(
		&mut self,
		middleware: impl Into<SharedMiddleware>,
		priority: i16,
	) -> Result<&mut Self, Error> {
		let group = self.group_id();
		self.router_mut()
			.use_on_group(group, &middleware.into(), Some(priority))?;
		Ok(self)
	}

	/// Only allowed before the group has routes or subgroups.
	fn set_prefix(&mut self, prefix: &str) -> Result<&mut Self, Error> {
		let group = self.group_id();
		self.router_mut().set_group_prefix(group, prefix)?;
		Ok(self)
	}

	fn prefix(&self) -> &str {
		self.router().group_prefix(self.group_id())
	}
}

impl Scope for Router {
	fn router(&self) -> &Router {
		self
	}

	fn router_mut(&mut self) -> &mut Router {
		self
	}

	fn group_id(&self) -> GroupId {
		GroupId::ROOT
	}
}

/// A subgroup of routes, borrowed from its router while being built.
pub struct Group<'r> {
	router: &'r mut Router,
	id: GroupId,
}

impl<'r> Group<'r> {
	pub(crate) fn new(router: &'r mut Router, id: GroupId) -> Self {
		Self { router, id }
	}
}

impl Scope for Group<'_> {
	fn router(&self) -> &Router {
		&*self.router
	}

	fn router_mut(&mut self) -> &mut Router {
		&mut *self.router
	}

	fn group_id(&self) -> GroupId {
		self.id
	}
}

impl Debug for Group<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Group")
			.field("id", &self.id)
			.field("prefix", &self.prefix())
			.finish()
	}
}

/// A freshly added route, used to attach middleware to it alone.
pub struct Route<'r> {
	router: &'r mut Router,
	id: RouteId,
}

impl Route<'_> {
	pub fn id(&self) -> RouteId {
		self.id
	}

	pub fn record(&self) -> &RouteRecord {
		&self.router.routes[self.id.0]
	}

	pub fn use_middleware(self, middleware: impl Into<SharedMiddleware>) -> Result<Self, Error> {
		self.router.use_on_route(self.id, &middleware.into(), None)?;
		Ok(self)
	}

	pub fn use_middleware_at(
		self,
		middleware: impl Into<SharedMiddleware>,
		priority: i16,
	) -> Result<Self, Error> {
		self.router
			.use_on_route(self.id, &middleware.into(), Some(priority))?;
		Ok(self)
	}
}

impl Debug for Route<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Route").field(self.record()).finish()
	}
}

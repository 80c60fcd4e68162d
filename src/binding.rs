use crate::{RouteId, RouteMethod};
use std::collections::HashMap;

type Methods = HashMap<RouteMethod, RouteId>;

/// All routes sharing one path pattern, split by host and then by method.
///
/// The empty host binds any host. It is only consulted when the request host has no bucket of its own.
#[derive(Debug, Default)]
pub struct RouteSet {
	hosts: HashMap<String, Methods>,
	match_host: bool,
}

/// Outcome of picking a route out of a [`RouteSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
	Found(RouteId),
	MethodNotAllowed,
	NotFound,
}

impl RouteSet {
	pub fn contains(&self, host: &str, method: RouteMethod) -> bool {
		self.hosts
			.get(host)
			.map_or(false, |methods| methods.contains_key(&method))
	}

	/// Binds a route. Callers check [`RouteSet::contains`] first, an existing binding is replaced.
	pub fn insert(&mut self, host: &str, method: RouteMethod, route: RouteId) {
		if !host.is_empty() {
			self.match_host = true;
		}
		self.hosts
			.entry(host.to_owned())
			.or_default()
			.insert(method, route);
	}

	/// Whether any host-specific route is bound.
	pub fn matches_host(&self) -> bool {
		self.match_host
	}

	/// Picks the route for a request. `method` is `None` for methods outside [`RouteMethod`], which only
	/// `RouteMethod::Any` can serve.
	pub fn resolve(&self, host: &str, method: Option<RouteMethod>) -> Binding {
		let bucket = if self.match_host {
			self.hosts.get(host).or_else(|| self.hosts.get(""))
		} else {
			self.hosts.get("")
		};

		let methods = match bucket {
			Some(methods) => methods,
			None => return Binding::NotFound,
		};

		method
			.and_then(|method| methods.get(&method))
			.or_else(|| methods.get(&RouteMethod::Any))
			.map_or(Binding::MethodNotAllowed, |&route| Binding::Found(route))
	}
}

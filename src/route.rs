use crate::{
	handler::{Callable, ChainEntry},
	Context, RouteMethod,
};
use anyhow::Result;
use std::{
	fmt::{self, Display, Formatter},
	ops::Deref,
};

/// Index of a route inside its router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteId(pub(crate) usize);

/// A registered route: where it is bound and the chain it runs.
pub struct RouteRecord {
	host: String,
	method: RouteMethod,
	pattern: String,
	chain: Vec<ChainEntry>,
}

impl RouteRecord {
	pub(crate) fn new(host: &str, method: RouteMethod, pattern: &str, handler: Callable) -> Self {
		Self {
			host: host.to_owned(),
			method,
			pattern: pattern.to_owned(),
			chain: vec![ChainEntry::handler(handler)],
		}
	}

	pub fn host(&self) -> &str {
		&self.host
	}

	pub fn method(&self) -> RouteMethod {
		self.method
	}

	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	/// Number of entries in the chain, main handler included.
	pub fn len(&self) -> usize {
		self.chain.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chain.is_empty()
	}

	/// Inserts right after the last entry whose key is strictly greater than the new one.
	pub(crate) fn insert(&mut self, entry: ChainEntry) {
		let at = self
			.chain
			.iter()
			.rposition(|existing| existing.key > entry.key)
			.map_or(0, |i| i + 1);
		self.chain.insert(at, entry);
	}

	/// Runs the chain until an entry asks to stop.
	pub(crate) fn run(&self, ctx: &mut Context) -> Result<()> {
		for entry in &self.chain {
			if !entry.call(ctx)? {
				break;
			}
		}
		Ok(())
	}

	pub fn info(&self) -> RouteInfo {
		RouteInfo {
			host: self.host.clone(),
			method: self.method,
			pattern: self.pattern.clone(),
		}
	}
}

impl fmt::Debug for RouteRecord {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteRecord")
			.field("host", &self.host)
			.field("method", &self.method)
			.field("pattern", &self.pattern)
			.field("chain", &self.chain.len())
			.finish()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
	pub host: String,
	pub method: RouteMethod,
	pub pattern: String,
}

/// Every registered route, sorted by host, pattern and method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteList(Vec<RouteInfo>);

impl RouteList {
	pub fn new(mut routes: Vec<RouteInfo>) -> Self {
		routes.sort_by(|a, b| {
			(a.host.as_str(), a.pattern.as_str(), a.method.as_str()).cmp(&(
				b.host.as_str(),
				b.pattern.as_str(),
				b.method.as_str(),
			))
		});
		Self(routes)
	}
}

impl Deref for RouteList {
	type Target = [RouteInfo];

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl IntoIterator for RouteList {
	type Item = RouteInfo;
	type IntoIter = std::vec::IntoIter<RouteInfo>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

impl Display for RouteList {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let host_width = self.0.iter().map(|r| r.host.len()).max().unwrap_or(0);
		let method_width = self.0.iter().map(|r| r.method.as_str().len()).max().unwrap_or(0);

		for route in &self.0 {
			writeln!(
				f,
				"{:mw$} {:hw$} {}",
				route.method.as_str(),
				route.host,
				route.pattern,
				mw = method_width,
				hw = host_width
			)?;
		}
		Ok(())
	}
}

use crate::Error;
use std::{
	collections::HashMap,
	fmt::{self, Display, Formatter},
	mem,
};

/// Captured path parameters, keyed by parameter name.
pub type Params = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
	/// Literal text.
	Static,
	/// A named capture running up to the next `/`.
	Param,
}

/// A prefix-compressed tree of route patterns such as `/user/:name/posts`.
///
/// Static nodes hold the longest literal shared by every pattern passing through them and are split as
/// new patterns arrive. Param nodes hold the parameter name. A node carries a value only where a pattern
/// ends.
#[derive(Debug, Clone)]
pub struct PatternTree<T> {
	kind: Kind,
	text: String,
	value: Option<T>,
	children: Vec<PatternTree<T>>,
}

/// A successful lookup.
#[derive(Debug, PartialEq, Eq)]
pub struct Match<'a, T> {
	pub value: &'a T,
	pub params: Params,
	/// The path is one `/` short of the pattern that matched.
	pub redirect: bool,
	/// Number of bytes of the path consumed by the pattern.
	pub len: usize,
}

enum Merge<T> {
	Done,
	Refused(PatternTree<T>),
}

impl<T> Default for PatternTree<T> {
	fn default() -> Self {
		Self {
			kind: Kind::Static,
			text: String::new(),
			value: None,
			children: Vec::new(),
		}
	}
}

impl<T> PatternTree<T> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.text.is_empty() && self.children.is_empty()
	}

	/// Inserts `pattern`, splitting existing nodes where it shares a literal prefix with them.
	///
	/// Inserting a pattern that is already present replaces its value.
	pub fn insert(&mut self, pattern: &str, value: T) -> Result<(), Error> {
		if pattern.is_empty() {
			return Err(Error::pattern(pattern, "pattern should not be empty"));
		}
		if !pattern.starts_with('/') {
			return Err(Error::pattern(pattern, "pattern should start with /"));
		}
		// only the path is routed, never the query
		if pattern.contains('?') {
			return Err(Error::pattern(pattern, "pattern should not contain ?"));
		}

		let branch = Self::branch(pattern, value)?;

		// A conflict is only found below nodes whose text matched exactly, so nothing has been split
		// by the time it is reported.
		match self.merge(branch) {
			Ok(Merge::Done) => Ok(()),
			Ok(Merge::Refused(_)) => Err(Error::Conflict {
				pattern: pattern.to_owned(),
				reason: "no common root".to_owned(),
			}),
			Err(reason) => Err(Error::Conflict {
				pattern: pattern.to_owned(),
				reason,
			}),
		}
	}

	/// Turns a pattern into a single chain of alternating static and param nodes.
	fn branch(pattern: &str, value: T) -> Result<Self, Error> {
		let mut segments = vec![];
		let mut rest = pattern;

		while !rest.is_empty() {
			match rest.find(':') {
				None => {
					segments.push((Kind::Static, rest));
					rest = "";
				}
				Some(at) => {
					if at > 0 {
						segments.push((Kind::Static, &rest[..at]));
					}
					let capture = &rest[at + 1..];
					let end = capture.find('/').unwrap_or(capture.len());
					if end == 0 {
						return Err(Error::pattern(pattern, "param name should not be empty"));
					}
					segments.push((Kind::Param, &capture[..end]));
					rest = &capture[end..];
				}
			}
		}

		let mut value = Some(value);
		let mut node: Option<Self> = None;
		for (kind, text) in segments.into_iter().rev() {
			node = Some(Self {
				kind,
				text: text.to_owned(),
				value: if node.is_none() { value.take() } else { None },
				children: node.into_iter().collect(),
			});
		}

		Ok(node.unwrap_or_default())
	}

	fn merge(&mut self, mut incoming: Self) -> Result<Merge<T>, String> {
		if self.is_empty() {
			*self = incoming;
			return Ok(Merge::Done);
		}

		match (self.kind, incoming.kind) {
			(Kind::Static, Kind::Static) => {
				let shared = common_prefix(&self.text, &incoming.text);
				if shared == 0 {
					return Ok(Merge::Refused(incoming));
				}
				if shared < self.text.len() {
					self.split(shared);
				}
				if shared < incoming.text.len() {
					incoming.split(shared);
				}
				self.absorb(incoming)
			}
			(Kind::Param, Kind::Param) if self.text == incoming.text => self.absorb(incoming),
			_ => Ok(Merge::Refused(incoming)),
		}
	}

	/// Merges a node occupying the same position as `self`.
	fn absorb(&mut self, mut incoming: Self) -> Result<Merge<T>, String> {
		let mut child = match incoming.children.pop() {
			Some(child) => child,
			None => {
				self.value = incoming.value;
				return Ok(Merge::Done);
			}
		};

		for existing in self.children.iter_mut() {
			match existing.merge(child)? {
				Merge::Done => return Ok(Merge::Done),
				Merge::Refused(refused) => child = refused,
			}
		}

		if child.kind == Kind::Param {
			if let Some(param) = self.children.iter().find(|c| c.kind == Kind::Param) {
				return Err(format!(
					"param ':{}' is ambiguous with ':{}' at the same position",
					child.text, param.text
				));
			}
		}

		self.children.push(child);
		Ok(Merge::Done)
	}

	/// Keeps the first `at` bytes of the text and pushes the rest down into a new child.
	fn split(&mut self, at: usize) {
		let suffix = Self {
			kind: Kind::Static,
			text: self.text.split_off(at),
			value: self.value.take(),
			children: mem::take(&mut self.children),
		};
		self.children = vec![suffix];
	}

	/// Finds the most specific pattern matching `path`.
	///
	/// Static nodes match at a `/` boundary, so `/user/:name` also serves `/user/bob/profile` unless
	/// something more specific exists. A path one trailing `/` short of a pattern matches it with
	/// `redirect` set.
	pub fn find(&self, path: &str) -> Option<Match<'_, T>> {
		match self.kind {
			Kind::Static => self.find_static(path),
			Kind::Param => self.find_param(path),
		}
	}

	fn find_static(&self, path: &str) -> Option<Match<'_, T>> {
		let text = self.text.as_str();

		if text.len() <= path.len() {
			if !path.starts_with(text) {
				return None;
			}
			let rest = &path[text.len()..];

			match self.find_children(rest) {
				Some(mut found) => {
					if found.len != 0 {
						found.len += text.len();
					} else if let Some(value) = &self.value {
						// a child only suggested a redirect, this node is exact
						found.value = value;
						found.redirect = false;
						found.len = text.len();
					}
					Some(found)
				}
				None if rest.is_empty() || rest.starts_with('/') => self.value.as_ref().map(|value| Match {
					value,
					params: Params::new(),
					redirect: false,
					len: text.len(),
				}),
				None => None,
			}
		} else if text.len() == path.len() + 1 && text.ends_with('/') && text.starts_with(path) {
			self.value.as_ref().map(|value| Match {
				value,
				params: Params::new(),
				redirect: true,
				len: path.len(),
			})
		} else {
			None
		}
	}

	fn find_param(&self, path: &str) -> Option<Match<'_, T>> {
		let end = path.find('/').unwrap_or(path.len());
		if end == 0 {
			return None;
		}
		let (capture, rest) = path.split_at(end);

		let mut found = match self.find_children(rest) {
			Some(mut found) => {
				if found.redirect && found.len == 0 {
					if let Some(value) = &self.value {
						found.value = value;
						found.redirect = false;
					}
				}
				found.len += capture.len();
				found
			}
			None => Match {
				value: self.value.as_ref()?,
				params: Params::new(),
				redirect: false,
				len: capture.len(),
			},
		};

		found.params.insert(self.text.clone(), capture.to_owned());
		Some(found)
	}

	fn find_children(&self, path: &str) -> Option<Match<'_, T>> {
		let mut best: Option<Match<'_, T>> = None;
		let mut static_matched = false;

		for child in &self.children {
			if child.kind == Kind::Static && static_matched {
				continue;
			}

			let current = match child.find(path) {
				Some(current) => current,
				None => continue,
			};
			if child.kind == Kind::Static {
				static_matched = true;
			}

			let better = match &best {
				None => true,
				Some(best) => {
					if best.len != current.len {
						best.len < current.len
					} else if best.redirect != current.redirect {
						best.redirect
					} else {
						best.params.len() > current.params.len()
					}
				}
			};
			if better {
				best = Some(current);
			}
		}

		best
	}

	fn write_indented(&self, f: &mut Formatter<'_>, indent: usize) -> fmt::Result {
		let text = match self.kind {
			Kind::Static => self.text.clone(),
			Kind::Param => format!(":{}", self.text),
		};
		writeln!(f, "{:indent$}{} : {}", "", text, self.value.is_some(), indent = indent)?;

		for child in &self.children {
			child.write_indented(f, indent + text.len())?;
		}
		Ok(())
	}
}

impl<T> Display for PatternTree<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		self.write_indented(f, 0)
	}
}

/// Length in bytes of the longest common prefix, kept on a char boundary.
fn common_prefix(a: &str, b: &str) -> usize {
	let mut len = a
		.bytes()
		.zip(b.bytes())
		.take_while(|(x, y)| x == y)
		.count();
	while !a.is_char_boundary(len) {
		len -= 1;
	}
	len
}

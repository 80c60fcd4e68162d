use crate::{
	tree::{Match, PatternTree},
	Error,
};
use std::collections::HashMap;

/// A pattern tree whose values can also be looked up by their literal pattern.
///
/// The tree only stores slot indices; values live in `slots` so a pattern and its tree node always agree
/// on the value.
#[derive(Debug)]
pub struct PatternMap<V> {
	tree: PatternTree<usize>,
	slots: Vec<V>,
	patterns: HashMap<String, usize>,
}

impl<V> Default for PatternMap<V> {
	fn default() -> Self {
		Self {
			tree: PatternTree::new(),
			slots: Vec::new(),
			patterns: HashMap::new(),
		}
	}
}

impl<V> PatternMap<V> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the value of `pattern`, replacing any value already stored for exactly that pattern.
	pub fn insert(&mut self, pattern: &str, value: V) -> Result<(), Error> {
		match self.patterns.get(pattern) {
			Some(&slot) => self.slots[slot] = value,
			None => {
				self.add(pattern, value)?;
			}
		}
		Ok(())
	}

	/// Returns the value stored for `pattern`, inserting one made by `default` first if there is none.
	pub fn get_or_insert_with<F>(&mut self, pattern: &str, default: F) -> Result<&mut V, Error>
	where
		F: FnOnce() -> V,
	{
		let slot = match self.patterns.get(pattern) {
			Some(&slot) => slot,
			None => self.add(pattern, default())?,
		};
		Ok(&mut self.slots[slot])
	}

	fn add(&mut self, pattern: &str, value: V) -> Result<usize, Error> {
		let slot = self.slots.len();
		self.tree.insert(pattern, slot)?;
		self.slots.push(value);
		self.patterns.insert(pattern.to_owned(), slot);
		Ok(slot)
	}

	/// Looks up a value by its literal pattern text.
	pub fn get(&self, pattern: &str) -> Option<&V> {
		self.patterns.get(pattern).map(|&slot| &self.slots[slot])
	}

	pub fn get_mut(&mut self, pattern: &str) -> Option<&mut V> {
		let slot = *self.patterns.get(pattern)?;
		Some(&mut self.slots[slot])
	}

	/// Matches a request path against every pattern.
	pub fn find(&self, path: &str) -> Option<Match<'_, V>> {
		let found = self.tree.find(path)?;
		Some(Match {
			value: &self.slots[*found.value],
			params: found.params,
			redirect: found.redirect,
			len: found.len,
		})
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	pub fn tree(&self) -> &PatternTree<usize> {
		&self.tree
	}
}

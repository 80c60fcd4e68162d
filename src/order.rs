use crate::Error;

/// Where an entry sits in a route's chain. Chains run in descending key order.
///
/// A middleware key is `(priority << 16) - sequence`, where non-negative priorities are first bumped by
/// one so the default priority of 0 still ranks ahead of every negative priority and ahead of the main
/// handler, whose key is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey(i64);

impl OrderKey {
	pub const HANDLER: OrderKey = OrderKey(0);

	pub fn new(priority: i16, sequence: u16) -> Self {
		let priority = if priority >= 0 {
			i64::from(priority) + 1
		} else {
			i64::from(priority)
		};
		OrderKey((priority << 16) - i64::from(sequence))
	}

	pub fn get(self) -> i64 {
		self.0
	}
}

/// Hands out declaration sequence numbers, starting at 1.
#[derive(Debug, Default)]
pub struct Sequencer {
	last: u16,
}

impl Sequencer {
	pub fn next(&mut self) -> Result<u16, Error> {
		self.last = self.last.checked_add(1).ok_or(Error::SequenceExhausted)?;
		Ok(self.last)
	}
}

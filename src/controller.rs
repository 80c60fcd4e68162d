use crate::Context;
use std::{
	any::{Any, TypeId},
	collections::HashMap,
	sync::Arc,
};

/// A type whose methods serve routes. Each request runs on a clone of the registered prototype:
/// `initialize`, the routed method, then `finalize`.
pub trait Controller: Clone + Send + Sync + 'static {
	fn initialize(&mut self, _ctx: &mut Context) {}

	fn finalize(&mut self, _ctx: &mut Context) {}
}

/// Registered controller prototypes, one per type.
#[derive(Default)]
pub(crate) struct Controllers {
	prototypes: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Controllers {
	pub fn register<C: Controller>(&mut self, prototype: C) {
		self.prototypes.insert(TypeId::of::<C>(), Arc::new(prototype));
	}

	pub fn prototype<C: Controller>(&self) -> Option<Arc<C>> {
		let prototype = self.prototypes.get(&TypeId::of::<C>())?;
		Arc::clone(prototype).downcast().ok()
	}
}

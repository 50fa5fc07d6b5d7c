use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Ordered handler slots that may be modified while they are being called.
pub(crate) struct CallbackSet<A: ?Sized> {
	handlers: RefCell<Vec<(HandlerId, Rc<dyn Fn(&A)>)>>,
	next_id: Cell<u64>,
}

impl<A: ?Sized> Default for CallbackSet<A> {
	fn default() -> Self {
		Self {
			handlers: RefCell::default(),
			next_id: Cell::new(0),
		}
	}
}

impl<A: ?Sized> CallbackSet<A> {
	pub fn add(&self, handler: Rc<dyn Fn(&A)>) -> HandlerId {
		let id = HandlerId(self.next_id.get());
		self.next_id.set(id.0 + 1);
		self.handlers.borrow_mut().push((id, handler));
		trace!("Added handler {:?}.", id);
		id
	}

	pub fn delete(&self, id: HandlerId) -> bool {
		let mut handlers = self.handlers.borrow_mut();
		let len = handlers.len();
		handlers.retain(|(other, _)| *other != id);
		let deleted = handlers.len() != len;
		if deleted {
			trace!("Deleted handler {:?}.", id);
		}
		deleted
	}

	/// Calls each handler registered at the time of the call, in registration order.
	///
	/// Handlers deleted by an earlier handler in the same dispatch are skipped.
	pub fn dispatch(&self, argument: &A) {
		let snapshot: Vec<(HandlerId, Rc<dyn Fn(&A)>)> = self.handlers.borrow().clone();
		for (id, handler) in snapshot {
			if self.contains(id) {
				handler(argument)
			}
		}
	}

	pub fn contains(&self, id: HandlerId) -> bool {
		self.handlers.borrow().iter().any(|(other, _)| *other == id)
	}

	pub fn len(&self) -> usize {
		self.handlers.borrow().len()
	}
}

impl<A: ?Sized> Debug for CallbackSet<A> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("CallbackSet").field("len", &self.len()).finish()
	}
}

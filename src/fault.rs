use std::{
	any::Any,
	backtrace::Backtrace,
	cell::RefCell,
	fmt::{self, Display, Formatter},
	panic::{self, AssertUnwindSafe},
	sync::Once,
};

thread_local! {
	static PANIC_BACKTRACE: RefCell<Option<Backtrace>> = RefCell::new(None);
}

static CAPTURE: Once = Once::new();

/// A panic caught at the dispatch boundary, with the stack of the panicking frame.
#[derive(Debug)]
pub(crate) struct Fault {
	pub message: String,
	pub backtrace: Backtrace,
}

impl Display for Fault {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

/// Chains a panic hook that records the backtrace while the panicking frame is still on the stack.
/// The previous hook still runs afterwards.
pub(crate) fn capture_panic_backtraces() {
	CAPTURE.call_once(|| {
		let previous = panic::take_hook();
		panic::set_hook(Box::new(move |info| {
			PANIC_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(Backtrace::force_capture()));
			previous(info);
		}));
	});
}

/// Runs `f`, turning a panic into a [`Fault`].
pub(crate) fn catch<R>(f: impl FnOnce() -> R) -> Result<R, Fault> {
	capture_panic_backtraces();
	PANIC_BACKTRACE.with(|slot| slot.borrow_mut().take());

	panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| Fault {
		message: panic_message(payload.as_ref()),
		backtrace: PANIC_BACKTRACE
			.with(|slot| slot.borrow_mut().take())
			.unwrap_or_else(Backtrace::force_capture),
	})
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_owned()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"panic with a non-string payload".to_owned()
	}
}

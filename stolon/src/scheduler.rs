//! Marshaling work onto the thread that owns a set of observables and futures.
//!
//! [`Observable`](`crate::Observable`), [`Subject`](`crate::Subject`) and the
//! [`Future`](`crate::Future`)/[`Promise`](`crate::Promise`) pair are `!Send`.
//! Background work that wants to complete a promise posts an action instead, which then runs
//! on the owning thread with access to owner-side context `C`.

use std::{
	collections::VecDeque,
	fmt::{self, Debug, Formatter},
	sync::Arc,
};

use parking_lot::Mutex;

/// Something that can run actions on an owning thread.
///
/// # Logic
///
/// Actions posted from one thread **must** run in the order they were posted.
pub trait Scheduler<C: ?Sized>: Send + Sync {
	/// Queues `action` to run with the owning thread's context.
	fn run_on_owning_thread(&self, action: Box<dyn 'static + Send + FnOnce(&C)>);
}

/// A FIFO [`Scheduler`] that the owning thread drains explicitly
/// (for example once per frame) via [`run_pending`](`QueueScheduler::run_pending`).
pub struct QueueScheduler<C: ?Sized> {
	queue: Arc<Mutex<VecDeque<Box<dyn 'static + Send + FnOnce(&C)>>>>,
}

impl<C: ?Sized> Clone for QueueScheduler<C> {
	fn clone(&self) -> Self {
		Self {
			queue: Arc::clone(&self.queue),
		}
	}
}

impl<C: ?Sized> Default for QueueScheduler<C> {
	fn default() -> Self {
		Self {
			queue: Arc::default(),
		}
	}
}

impl<C: ?Sized> Debug for QueueScheduler<C> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("QueueScheduler")
			.field("pending", &self.queue.lock().len())
			.finish()
	}
}

impl<C: ?Sized> QueueScheduler<C> {
	/// An empty queue.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Posts `action` to run on the owning thread.
	pub fn post(&self, action: impl 'static + Send + FnOnce(&C)) {
		self.queue.lock().push_back(Box::new(action));
	}

	/// Runs queued actions with `context` until the queue is empty.
	///
	/// Actions posted while this runs (from any thread) also run before it returns.
	/// The queue lock is never held while an action runs.
	///
	/// **Returns** how many actions ran.
	pub fn run_pending(&self, context: &C) -> usize {
		let mut ran = 0;
		loop {
			let Some(action) = self.queue.lock().pop_front() else {
				break ran;
			};
			action(context);
			ran += 1;
		}
	}
}

impl<C: ?Sized> Scheduler<C> for QueueScheduler<C> {
	fn run_on_owning_thread(&self, action: Box<dyn 'static + Send + FnOnce(&C)>) {
		self.queue.lock().push_back(action);
	}
}

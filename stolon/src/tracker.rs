use std::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
	mem,
};

use crate::Subscription;

/// Takes ownership of [`Subscription`]s and releases them when its scope ends.
pub trait DisposableTracker {
	/// Takes ownership of `subscription` until disposal.
	fn track(&self, subscription: Subscription);
}

/// A [`DisposableTracker`] that unsubscribes everything it tracks on [`dispose`](`DisposableScope::dispose`)
/// or when dropped.
#[derive(Default)]
pub struct DisposableScope {
	tracked: RefCell<Vec<Subscription>>,
}

impl Debug for DisposableScope {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("DisposableScope")
			.field("tracked", &self.len())
			.finish()
	}
}

impl DisposableScope {
	/// An empty scope.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Unsubscribes all tracked [`Subscription`]s in tracking order.
	///
	/// Subscriptions tracked while this runs are disposed too, after the ones tracked before.
	///
	/// **Returns** how many of them were still subscribed.
	pub fn dispose(&self) -> usize {
		let mut released = 0;
		loop {
			let batch = mem::take(&mut *self.tracked.borrow_mut());
			if batch.is_empty() {
				break released;
			}
			for mut subscription in batch {
				if subscription.unsubscribe() {
					released += 1;
				}
			}
		}
	}

	/// How many [`Subscription`]s are waiting for disposal.
	#[must_use]
	pub fn len(&self) -> usize {
		self.tracked.borrow().len()
	}

	/// Whether nothing is waiting for disposal.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl DisposableTracker for DisposableScope {
	fn track(&self, subscription: Subscription) {
		self.tracked.borrow_mut().push(subscription);
	}
}

impl Drop for DisposableScope {
	fn drop(&mut self) {
		self.dispose();
	}
}

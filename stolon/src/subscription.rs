use std::{
	fmt::{self, Debug, Formatter},
	mem,
	rc::Rc,
};

use crate::slots::SlotKey;

/// Implemented by producers that track their subscribers through [`Slots`](`crate::slots::Slots`).
pub(crate) trait SlotOwner {
	/// Unsubscribes the record registered under `key`.
	///
	/// **Returns** whether `key` still referred to a subscribed record.
	fn release(&self, key: SlotKey) -> bool;

	/// The handle for `key` was dropped while subscribed.
	fn abandon(&self, key: SlotKey);

	/// The handle for `key` was given up on purpose.
	fn detach(&self, key: SlotKey);
}

enum Release {
	Action(Box<dyn FnOnce()>),
	Slot { owner: Rc<dyn SlotOwner>, key: SlotKey },
}

/// A handle representing one registered callback.
///
/// [`unsubscribe`](`Subscription::unsubscribe`) releases the registration at most once.
///
/// Handles returned by [`Observable::subscribe`](`crate::Observable::subscribe`) keep their
/// observable alive until released, which in turn keeps derived observables connected upstream.
///
/// # Dropping
///
/// Handles returned by [`Observable::subscribe`](`crate::Observable::subscribe`) **should** be
/// either unsubscribed, handed to a [`DisposableTracker`](`crate::DisposableTracker`) or
/// [`detach`](`Subscription::detach`)ed. Dropping one while it's still subscribed *abandons*
/// it: The observable reports the registration site through its
/// [`DiagnosticsRef`](`crate::DiagnosticsRef`) on its next event and stops delivering to it.
///
/// (With the `detach_on_drop` feature, dropping detaches instead.)
///
/// Dropping a handle created through [`Subscription::new`] discards the release action without running it.
#[must_use = "Dropping a subscribed handle abandons it. Unsubscribe, track or detach it instead."]
pub struct Subscription {
	release: Option<Release>,
}

impl Debug for Subscription {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("subscribed", &self.is_subscribed())
			.finish_non_exhaustive()
	}
}

impl Default for Subscription {
	fn default() -> Self {
		Self::empty()
	}
}

impl Subscription {
	/// Wraps an arbitrary release action. It runs on the first call to [`unsubscribe`](`Subscription::unsubscribe`).
	pub fn new(release: impl 'static + FnOnce()) -> Self {
		Self {
			release: Some(Release::Action(Box::new(release))),
		}
	}

	/// A handle that was never subscribed to anything.
	pub const fn empty() -> Self {
		Self { release: None }
	}

	pub(crate) fn from_slot(owner: Rc<dyn SlotOwner>, key: SlotKey) -> Self {
		Self {
			release: Some(Release::Slot { owner, key }),
		}
	}

	/// `true` until the first successful call to [`unsubscribe`](`Subscription::unsubscribe`).
	#[must_use]
	pub fn is_subscribed(&self) -> bool {
		self.release.is_some()
	}

	/// Releases the registration.
	///
	/// **Idempotent** aside from the return value.
	/// **Returns** whether this call performed the release.
	pub fn unsubscribe(&mut self) -> bool {
		match self.release.take() {
			None => false,
			Some(Release::Action(action)) => {
				action();
				true
			}
			Some(Release::Slot { owner, key }) => {
				owner.release(key);
				true
			}
		}
	}

	/// Gives up this handle without unsubscribing.
	///
	/// The registration stays active indefinitely and is never reported as leaked.
	/// For observable subscriptions, this keeps the observable (and its upstream) alive.
	///
	/// Detaching a handle created through [`Subscription::new`] discards its release action.
	pub fn detach(mut self) {
		match self.release.take() {
			None | Some(Release::Action(_)) => (),
			Some(Release::Slot { owner, key }) => {
				owner.detach(key);
				mem::forget(owner);
			}
		}
	}

	/// Moves the registration out of `self`, leaving an [`empty`](`Subscription::empty`) handle behind.
	pub fn take(&mut self) -> Self {
		mem::take(self)
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(Release::Slot { owner, key }) = self.release.take() {
			if cfg!(feature = "detach_on_drop") {
				owner.detach(key);
				mem::forget(owner);
			} else {
				owner.abandon(key);
			}
		}
	}
}

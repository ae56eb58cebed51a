//! [`stolon::Future`] => [`core::future::Future`] adapter.

use std::{
	future::Future as _,
	pin::Pin,
	task::{Context, Poll},
};

use futures_channel::oneshot;
use pin_project::{pin_project, pinned_drop};
use stolon::Subscription;

/// Resolves to the value of a [`stolon::Future`], or [`None`] if it can't complete anymore.
///
/// Dropping this removes its completion callback.
#[must_use = "Futures do nothing unless awaited."]
#[pin_project(PinnedDrop)]
pub struct Completion<T> {
	#[pin]
	receiver: oneshot::Receiver<T>,
	registration: Subscription,
}

#[pinned_drop]
impl<T> PinnedDrop for Completion<T> {
	fn drop(self: Pin<&mut Self>) {
		self.project().registration.unsubscribe();
	}
}

impl<T> core::future::Future for Completion<T> {
	type Output = Option<T>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		self.project().receiver.poll(cx).map(Result::ok)
	}
}

/// Awaits `future` from `async` code running on its owning thread.
///
/// Resolves to [`None`] once the promise and every [`stolon::Future`] handle are gone
/// without a value having been set.
pub fn completion<T: 'static + Clone>(future: &stolon::Future<T>) -> Completion<T> {
	let (sender, receiver) = oneshot::channel();
	let registration = future.on_complete(move |value| {
		// The receiver unregisters this callback when dropped.
		sender.send(value.clone()).ok();
	});
	Completion {
		receiver,
		registration,
	}
}

#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]
//! Operators and collections built on top of [`stolon`].

use std::{cell::RefCell, rc::Rc};

use stolon::{DiagnosticsRef, Future, Observable, Promise, Subscription};

pub mod future;

mod rx_map;
pub use rx_map::{Change, RxMap};

/// A derived observable that skips values equal to the one it emitted last.
///
/// The comparison starts over whenever the derived observable reconnects.
#[must_use]
pub fn debounce<T: 'static + Clone + PartialEq, D: 'static + DiagnosticsRef>(
	source: &Observable<T, D>,
) -> Observable<T, D> {
	let upstream = source.clone();
	Observable::from_source_with_diagnostics(
		move |emitter| {
			let mut previous = None::<T>;
			upstream.subscribe(move |value: &T| {
				if previous.as_ref() != Some(value) {
					previous = Some(value.clone());
					emitter.submit(value.clone());
				}
			})
		},
		source.diagnostics().clone(),
	)
}

/// A derived observable emitting `(previous, current)` for each value after the first.
#[must_use]
pub fn pairwise<T: 'static + Clone, D: 'static + DiagnosticsRef>(
	source: &Observable<T, D>,
) -> Observable<(T, T), D> {
	let upstream = source.clone();
	Observable::from_source_with_diagnostics(
		move |emitter| {
			let mut previous = None::<T>;
			upstream.subscribe(move |value: &T| {
				if let Some(previous) = previous.replace(value.clone()) {
					emitter.submit((previous, value.clone()));
				}
			})
		},
		source.diagnostics().clone(),
	)
}

/// A [`Future`] completed with the next value `source` emits.
///
/// Stays subscribed to `source` (and keeps it alive) until then.
pub fn first<T: 'static + Clone, D: 'static + DiagnosticsRef>(
	source: &Observable<T, D>,
) -> Future<T> {
	let promise = Promise::new();
	let future = promise.future();
	let handle = Rc::new(RefCell::new(Subscription::empty()));

	let mut subscription = source.subscribe({
		let handle = Rc::clone(&handle);
		move |value: &T| {
			if promise.try_complete(value.clone()) {
				handle.borrow_mut().unsubscribe();
			}
		}
	});

	// `source` may emit while connecting upstream, before `handle` is filled in.
	if future.is_completed() {
		subscription.unsubscribe();
	} else {
		*handle.borrow_mut() = subscription;
	}
	future
}

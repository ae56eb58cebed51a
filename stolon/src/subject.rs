use std::{
	fmt::{self, Debug, Formatter},
	ops::Deref,
};

use crate::{DiagnosticsRef, Observable, TracingDiagnostics};

/// A source [`Observable`] with a public [`submit`](`Subject::submit`).
///
/// Hand out [`as_observable`](`Subject::as_observable`) to consumers that should only subscribe.
pub struct Subject<T, D: DiagnosticsRef = TracingDiagnostics>(Observable<T, D>);

impl<T, D: DiagnosticsRef> Clone for Subject<T, D> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<T, D: DiagnosticsRef> Debug for Subject<T, D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Subject").field(&self.0).finish()
	}
}

impl<T: 'static, D: 'static + DiagnosticsRef + Default> Default for Subject<T, D> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T, D: DiagnosticsRef> Deref for Subject<T, D> {
	type Target = Observable<T, D>;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl<T: 'static, D: 'static + DiagnosticsRef> Subject<T, D> {
	/// A subject reporting through `D`'s default instance (by default, [`tracing`]).
	#[must_use]
	pub fn new() -> Self
	where
		D: Default,
	{
		Self::with_diagnostics(D::default())
	}

	/// A subject reporting through `diagnostics`.
	#[must_use]
	pub fn with_diagnostics(diagnostics: D) -> Self {
		Self(Observable::source_with_diagnostics(diagnostics))
	}

	/// Delivers `value` to all current subscribers, in subscription order.
	///
	/// When called during a delivery pass of this subject (i.e. from one of its subscribers),
	/// `value` is queued and delivered after that pass and any values queued before it.
	///
	/// # Panics
	///
	/// Iff a callback panics. The subject stays usable, but values that were queued
	/// behind the panicking pass are discarded.
	pub fn submit(&self, value: T) {
		self.0.submit(value);
	}

	/// Cheaply clones the read-only side.
	#[must_use]
	pub fn as_observable(&self) -> Observable<T, D> {
		self.0.clone()
	}
}

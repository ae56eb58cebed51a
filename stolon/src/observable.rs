//! Push-based event streams.
//!
//! # Ordering
//!
//! Every subscriber sees a submitted value before any subscriber sees the next one.
//! A value submitted from inside a callback is queued and delivered (to everyone) once the
//! current pass is done:
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//! use stolon::{shadow_clone, Subject};
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let subject = Subject::<i32>::new();
//!
//! let mut a = subject.subscribe({
//! 	shadow_clone!(log, subject);
//! 	move |&n| {
//! 		log.borrow_mut().push(("a", n));
//! 		if n == 0 {
//! 			subject.submit(1);
//! 		}
//! 	}
//! });
//! let mut b = subject.subscribe({
//! 	shadow_clone!(log);
//! 	move |&n| log.borrow_mut().push(("b", n))
//! });
//!
//! subject.submit(0);
//! assert_eq!(*log.borrow(), [("a", 0), ("b", 0), ("a", 1), ("b", 1)]);
//! # a.unsubscribe();
//! # b.unsubscribe();
//! ```
//!
//! A callback subscribed during a pass doesn't see the value currently being delivered.
//! A callback unsubscribed during a pass won't be called again, even within that pass.
//!
//! # Lifetimes
//!
//! Derived observables (from [`Observable::from_source`] and the combinators) hold their upstream
//! strongly but only subscribe to it while they have subscribers of their own.
//!
//! Each [`Subscription`] holds its observable until released, so a chain of derived observables
//! stays alive for as long as someone holds a subscription to its last link (or a handle to it).
//! Upstream observables only refer back through [`Emitter`]s, which are weak.

use std::{
	cell::RefCell,
	collections::VecDeque,
	fmt::{self, Debug, Formatter},
	mem,
	panic::Location,
	rc::{Rc, Weak},
};

use scopeguard::{guard, ScopeGuard};

use crate::{
	diagnostics::{DiagnosticsRef, TracingDiagnostics},
	slots::{Liveness, SlotKey, Slots},
	subscription::SlotOwner,
	DisposableTracker, Subscription,
};

type Callback<T> = Rc<RefCell<dyn FnMut(&T)>>;

/// A push-based event stream. Cheap to [`Clone`]; clones share subscribers.
///
/// `D` receives leak reports, see [`Subscription`].
pub struct Observable<T, D: DiagnosticsRef = TracingDiagnostics> {
	inner: Rc<Inner<T, D>>,
}

impl<T, D: DiagnosticsRef> Clone for Observable<T, D> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T, D: DiagnosticsRef> Debug for Observable<T, D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let state = self.inner.state.borrow();
		f.debug_struct("Observable")
			.field("subscribers", &state.subscribers())
			.field("iterating", &state.iterating)
			.field("pending_submits", &state.pending_submits.len())
			.finish_non_exhaustive()
	}
}

/// Producer-side handle passed to upstream connectors.
///
/// Doesn't keep the observable alive. Submitting after it's gone does nothing.
pub struct Emitter<T, D: DiagnosticsRef = TracingDiagnostics> {
	inner: Weak<Inner<T, D>>,
}

impl<T, D: DiagnosticsRef> Clone for Emitter<T, D> {
	fn clone(&self) -> Self {
		Self {
			inner: Weak::clone(&self.inner),
		}
	}
}

impl<T, D: DiagnosticsRef> Debug for Emitter<T, D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Emitter")
			.field("alive", &(self.inner.strong_count() > 0))
			.finish()
	}
}

impl<T: 'static, D: 'static + DiagnosticsRef> Emitter<T, D> {
	/// Submits `value` to the observable this emitter was created for, if it still exists.
	pub fn submit(&self, value: T) {
		if let Some(inner) = self.inner.upgrade() {
			inner.submit(value);
		}
	}
}

struct Inner<T, D: DiagnosticsRef> {
	this: Weak<Self>,
	state: RefCell<State<T>>,
	origin: Origin<T, D>,
	diagnostics: D,
}

enum Origin<T, D: DiagnosticsRef> {
	Source,
	Derived(Activation<T, D>),
}

struct Activation<T, D: DiagnosticsRef> {
	connect: Box<dyn Fn(Emitter<T, D>) -> Subscription>,
	link: RefCell<Link>,
}

enum Link {
	Idle,
	Connecting,
	Live(Subscription),
}

struct State<T> {
	records: Vec<Record<T>>,
	slots: Slots,
	pending_submits: VecDeque<T>,
	iterating: bool,
	pending_activations: usize,
	pending_removals: usize,
}

struct Record<T> {
	on_event: Callback<T>,
	key: SlotKey,
	/// Records added mid-pass start inactive.
	active: bool,
	unsubscribed: bool,
	site: &'static Location<'static>,
}

enum Step<T> {
	Skip,
	Deliver(Callback<T>),
	Abandoned(&'static Location<'static>),
}

impl<T> State<T> {
	fn new() -> Self {
		Self {
			records: Vec::new(),
			slots: Slots::new(),
			pending_submits: VecDeque::new(),
			iterating: false,
			pending_activations: 0,
			pending_removals: 0,
		}
	}

	/// Records taking part in the current pass, or between passes, in the next one.
	fn subscribers(&self) -> usize {
		if self.iterating {
			self.records.len() - self.pending_activations
		} else {
			self.records.len() - self.pending_removals
		}
	}

	/// Decides what to do with the record at `index` for the current pass.
	fn step(&mut self, index: usize) -> Step<T> {
		let record = &mut self.records[index];
		if !record.active || record.unsubscribed {
			return Step::Skip;
		}
		match self.slots.get(record.key) {
			Some(Liveness::Held | Liveness::Detached) => Step::Deliver(Rc::clone(&record.on_event)),
			Some(Liveness::Abandoned) | None => {
				record.unsubscribed = true;
				self.pending_removals += 1;
				Step::Abandoned(record.site)
			}
		}
	}

	/// **Returns** whether a subscribed record was found for `key`, and removed records.
	fn unsubscribe(&mut self, key: SlotKey) -> (bool, Vec<Record<T>>) {
		let Some(record) = self
			.records
			.iter_mut()
			.find(|record| record.key == key && !record.unsubscribed)
		else {
			return (false, Vec::new());
		};
		record.unsubscribed = true;
		self.pending_removals += 1;
		if self.iterating {
			(true, Vec::new())
		} else {
			(true, self.after_iteration())
		}
	}

	/// Applies structural changes that were deferred while iterating.
	///
	/// **Returns** the removed records. They **must** be dropped only after the state borrow is released,
	/// since callbacks may own [`Subscription`]s to the same observable.
	#[must_use]
	fn after_iteration(&mut self) -> Vec<Record<T>> {
		if self.pending_activations != 0 {
			for record in &mut self.records {
				if !record.unsubscribed {
					record.active = true;
				}
			}
			self.pending_activations = 0;
		}
		if self.pending_removals == 0 {
			return Vec::new();
		}
		self.pending_removals = 0;
		let (removed, kept) = mem::take(&mut self.records)
			.into_iter()
			.partition::<Vec<_>, _>(|record| record.unsubscribed);
		self.records = kept;
		for record in &removed {
			self.slots.remove(record.key);
		}
		debug_assert_eq!(self.slots.len(), self.records.len());
		removed
	}
}

impl<T: 'static, D: 'static + DiagnosticsRef> Inner<T, D> {
	fn new(origin: Origin<T, D>, diagnostics: D) -> Rc<Self> {
		Rc::new_cyclic(|this| Self {
			this: Weak::clone(this),
			state: RefCell::new(State::new()),
			origin,
			diagnostics,
		})
	}

	fn submit(&self, value: T) {
		{
			let mut state = self.state.borrow_mut();
			if state.iterating {
				state.pending_submits.push_back(value);
				return;
			}
			state.iterating = true;
		}

		// Only reached by unwinding out of a callback.
		// Values queued behind the panicking pass are discarded.
		let unwind_guard = guard(self, |this| {
			let mut state = this.state.borrow_mut();
			state.iterating = false;
			let discarded = mem::take(&mut state.pending_submits);
			let removed = state.after_iteration();
			drop(state);
			drop((discarded, removed));
			this.settle();
		});

		let mut next = Some(value);
		while let Some(value) = next {
			self.deliver(&value);
			drop(value);
			let mut state = self.state.borrow_mut();
			let removed = state.after_iteration();
			next = state.pending_submits.pop_front();
			drop(state);
			drop(removed);
		}

		let _ = ScopeGuard::into_inner(unwind_guard);
		self.state.borrow_mut().iterating = false;
		self.settle();
	}

	/// One full pass over the current records.
	///
	/// Records are never removed while iterating, and new ones are appended inactive,
	/// so indices stay stable.
	fn deliver(&self, value: &T) {
		let mut index = 0;
		loop {
			let step = {
				let mut state = self.state.borrow_mut();
				if index >= state.records.len() {
					break;
				}
				state.step(index)
			};
			index += 1;

			match step {
				Step::Skip => (),
				Step::Deliver(on_event) => (&mut *on_event.borrow_mut())(value),
				Step::Abandoned(site) => self.diagnostics.warn(format_args!(
					"Active subscription was dropped without being unsubscribed, tracked or detached. \
					 Subscribed at {site}."
				)),
			}
		}
	}

	/// Adds a record, inactive iff a pass is in flight.
	fn register(&self, on_event: Callback<T>, site: &'static Location<'static>) -> SlotKey {
		let mut state = self.state.borrow_mut();
		let key = state.slots.insert();
		let active = !state.iterating;
		if !active {
			state.pending_activations += 1;
		}
		state.records.push(Record {
			on_event,
			key,
			active,
			unsubscribed: false,
			site,
		});
		key
	}

	/// Connects to upstream, unless already connected or connecting.
	fn activate(&self) {
		let Origin::Derived(activation) = &self.origin else {
			return;
		};
		{
			let mut link = activation.link.borrow_mut();
			if !matches!(*link, Link::Idle) {
				return;
			}
			*link = Link::Connecting;
		}

		tracing::debug!(target: "stolon", "Connecting derived observable to upstream.");
		// Only reached by unwinding out of `connect`.
		let unwind_guard = guard(&activation.link, |link| {
			let mut link = link.borrow_mut();
			if matches!(*link, Link::Connecting) {
				*link = Link::Idle;
			}
		});
		let mut upstream = (activation.connect)(Emitter {
			inner: Weak::clone(&self.this),
		});
		let _ = ScopeGuard::into_inner(unwind_guard);

		let mut link = activation.link.borrow_mut();
		if matches!(*link, Link::Connecting) {
			*link = Link::Live(upstream);
		} else {
			// Disconnected (and possibly reconnected) while `connect` ran.
			drop(link);
			upstream.unsubscribe();
		}
	}

	fn deactivate(&self) {
		let Origin::Derived(activation) = &self.origin else {
			return;
		};
		let previous = mem::replace(&mut *activation.link.borrow_mut(), Link::Idle);
		if let Link::Live(mut upstream) = previous {
			tracing::debug!(target: "stolon", "Disconnecting derived observable from upstream.");
			upstream.unsubscribe();
		}
	}

	/// Disconnects from upstream once no records remain outside a pass.
	fn settle(&self) {
		let idle = {
			let state = self.state.borrow();
			!state.iterating && state.subscribers() == 0
		};
		if idle {
			self.deactivate();
		}
	}
}

impl<T: 'static, D: 'static + DiagnosticsRef> SlotOwner for Inner<T, D> {
	fn release(&self, key: SlotKey) -> bool {
		let (released, removed) = self.state.borrow_mut().unsubscribe(key);
		drop(removed);
		if released {
			self.settle();
		}
		released
	}

	fn abandon(&self, key: SlotKey) {
		self.state.borrow_mut().slots.abandon(key);
	}

	fn detach(&self, key: SlotKey) {
		self.state.borrow_mut().slots.detach(key);
	}
}

impl<T, D: DiagnosticsRef> Drop for Inner<T, D> {
	fn drop(&mut self) {
		if let Origin::Derived(activation) = &mut self.origin {
			if let Link::Live(upstream) = activation.link.get_mut() {
				upstream.unsubscribe();
			}
		}
	}
}

impl<T: 'static, D: 'static + DiagnosticsRef> Observable<T, D> {
	pub(crate) fn source_with_diagnostics(diagnostics: D) -> Self {
		Self {
			inner: Inner::new(Origin::Source, diagnostics),
		}
	}

	/// An observable that never emits.
	#[must_use]
	pub fn empty() -> Self
	where
		D: Default,
	{
		Self::source_with_diagnostics(D::default())
	}

	/// A derived observable that calls `connect` when it gains its first subscriber
	/// and unsubscribes the returned [`Subscription`] when it loses its last one.
	///
	/// `connect` runs again on each later first subscriber.
	pub fn from_source(connect: impl 'static + Fn(Emitter<T, D>) -> Subscription) -> Self
	where
		D: Default,
	{
		Self::from_source_with_diagnostics(connect, D::default())
	}

	/// A derived observable that calls `connect` when it gains its first subscriber
	/// and unsubscribes the returned [`Subscription`] when it loses its last one.
	///
	/// `connect` runs again on each later first subscriber.
	pub fn from_source_with_diagnostics(
		connect: impl 'static + Fn(Emitter<T, D>) -> Subscription,
		diagnostics: D,
	) -> Self {
		Self {
			inner: Inner::new(
				Origin::Derived(Activation {
					connect: Box::new(connect),
					link: RefCell::new(Link::Idle),
				}),
				diagnostics,
			),
		}
	}

	/// Bridges a callback registration API.
	///
	/// `register` runs when the first subscriber arrives, `unregister` when the last one leaves.
	pub fn from_event(
		register: impl 'static + Fn(Emitter<T, D>),
		unregister: impl 'static + Fn(),
	) -> Self
	where
		D: Default,
	{
		let unregister = Rc::new(unregister);
		Self::from_source(move |emitter| {
			register(emitter);
			let unregister = Rc::clone(&unregister);
			Subscription::new(move || unregister())
		})
	}

	/// Registers `on_event` for every value submitted after this call returns.
	///
	/// If this is a derived observable without other subscribers, this connects it to its upstream.
	///
	/// When called during a delivery pass, `on_event` won't see the value currently being delivered.
	#[track_caller]
	pub fn subscribe(&self, on_event: impl 'static + FnMut(&T)) -> Subscription {
		let key = self
			.inner
			.register(Rc::new(RefCell::new(on_event)), Location::caller());
		let owner: Rc<dyn SlotOwner> = Rc::clone(&self.inner) as _;
		let subscription = Subscription::from_slot(owner, key);
		self.inner.activate();
		subscription
	}

	/// Like [`subscribe`](`Observable::subscribe`), but hands the [`Subscription`] to `tracker`.
	#[track_caller]
	pub fn subscribe_tracked(
		&self,
		tracker: &(impl ?Sized + DisposableTracker),
		on_event: impl 'static + FnMut(&T),
	) {
		tracker.track(self.subscribe(on_event));
	}

	/// The number of subscribers that will take part in the next delivery pass.
	///
	/// Subscriptions and unsubscriptions made during a pass only count once it completes.
	#[must_use]
	pub fn subscribers(&self) -> usize {
		self.inner.state.borrow().subscribers()
	}

	/// Delivers `value` to all current subscribers, in subscription order.
	///
	/// If a pass is already in flight, `value` is queued behind it instead.
	///
	/// # Panics
	///
	/// Iff a callback panics. The observable stays usable, but values that were queued
	/// behind the panicking pass are discarded.
	pub(crate) fn submit(&self, value: T) {
		self.inner.submit(value);
	}

	/// The diagnostics capability this observable reports through.
	pub fn diagnostics(&self) -> &D {
		&self.inner.diagnostics
	}

	/// A derived observable emitting `f` of each value.
	#[must_use]
	pub fn map<U: 'static>(&self, f: impl 'static + Fn(&T) -> U) -> Observable<U, D> {
		let upstream = self.clone();
		let f = Rc::new(f);
		Observable::from_source_with_diagnostics(
			move |emitter| {
				let f = Rc::clone(&f);
				upstream.subscribe(move |value| emitter.submit(f(value)))
			},
			self.diagnostics().clone(),
		)
	}

	/// A derived observable emitting the values for which `f` returns [`Some`].
	#[must_use]
	pub fn filter_map<U: 'static>(&self, f: impl 'static + Fn(&T) -> Option<U>) -> Observable<U, D> {
		let upstream = self.clone();
		let f = Rc::new(f);
		Observable::from_source_with_diagnostics(
			move |emitter| {
				let f = Rc::clone(&f);
				upstream.subscribe(move |value| {
					if let Some(mapped) = f(value) {
						emitter.submit(mapped);
					}
				})
			},
			self.diagnostics().clone(),
		)
	}

	/// A derived observable emitting (clones of) the values that satisfy `predicate`.
	#[must_use]
	pub fn filter(&self, predicate: impl 'static + Fn(&T) -> bool) -> Self
	where
		T: Clone,
	{
		self.filter_map(move |value| predicate(value).then(|| value.clone()))
	}

	/// A derived observable emitting (clones of) the values of both `self` and `other`.
	#[must_use]
	pub fn merge(&self, other: &Self) -> Self
	where
		T: Clone,
	{
		let (left, right) = (self.clone(), other.clone());
		Self::from_source_with_diagnostics(
			move |emitter| {
				let mut left = left.subscribe({
					let emitter = emitter.clone();
					move |value: &T| emitter.submit(value.clone())
				});
				let mut right = right.subscribe(move |value: &T| emitter.submit(value.clone()));
				Subscription::new(move || {
					left.unsubscribe();
					right.unsubscribe();
				})
			},
			self.diagnostics().clone(),
		)
	}

	/// A derived observable emitting the latest pair whenever either side emits,
	/// once both sides have emitted at least once.
	///
	/// Latest values are forgotten whenever the derived observable disconnects.
	#[must_use]
	pub fn zip<U: 'static + Clone>(&self, other: &Observable<U, D>) -> Observable<(T, U), D>
	where
		T: Clone,
	{
		let (left, right) = (self.clone(), other.clone());
		Observable::from_source_with_diagnostics(
			move |emitter| {
				let latest = Rc::new(RefCell::new((None::<T>, None::<U>)));
				let mut left = left.subscribe({
					let (latest, emitter) = (Rc::clone(&latest), emitter.clone());
					move |value: &T| {
						let pair = {
							let mut latest = latest.borrow_mut();
							latest.0 = Some(value.clone());
							latest.1.clone().map(|right| (value.clone(), right))
						};
						if let Some(pair) = pair {
							emitter.submit(pair);
						}
					}
				});
				let mut right = right.subscribe(move |value: &U| {
					let pair = {
						let mut latest = latest.borrow_mut();
						latest.1 = Some(value.clone());
						latest.0.clone().map(|left| (left, value.clone()))
					};
					if let Some(pair) = pair {
						emitter.submit(pair);
					}
				});
				Subscription::new(move || {
					left.unsubscribe();
					right.unsubscribe();
				})
			},
			self.diagnostics().clone(),
		)
	}
}

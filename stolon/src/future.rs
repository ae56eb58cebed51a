//! Single-assignment deferred values.
//!
//! A [`Promise`] completes its [`Future`]s exactly once. Completion callbacks run synchronously,
//! either during completion (in registration order) or immediately on registration if the value
//! is already present.
//!
//! These are unrelated to [`core::future::Future`]. See `stolon-extra` for an `async` bridge.

use std::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
	mem,
	rc::{Rc, Weak},
};

use thiserror::Error;

use crate::Subscription;

type Listener<T> = Box<dyn FnOnce(&Rc<T>)>;

/// Returned by [`Promise::complete`] when the future already holds a value.
#[derive(Debug, Error)]
#[error("Tried to complete a future with {attempted:?}, but it is already completed with {existing:?}.")]
pub struct AlreadyCompleted<T> {
	/// The value the future was completed with first.
	pub existing: Rc<T>,
	/// The value that was rejected.
	pub attempted: T,
}

enum State<T> {
	Pending {
		listeners: Vec<(u64, Listener<T>)>,
		next_id: u64,
	},
	Completed(Rc<T>),
}

struct Cell<T> {
	state: RefCell<State<T>>,
}

impl<T> Cell<T> {
	fn new() -> Rc<Self> {
		Rc::new(Self {
			state: RefCell::new(State::Pending {
				listeners: Vec::new(),
				next_id: 0,
			}),
		})
	}

	fn value(&self) -> Option<Rc<T>> {
		match &*self.state.borrow() {
			State::Pending { .. } => None,
			State::Completed(value) => Some(Rc::clone(value)),
		}
	}

	/// Stores `value` and runs the listeners registered so far.
	///
	/// Listeners are moved out before any of them runs, so they may freely register
	/// (which then runs synchronously) or unsubscribe (which then does nothing).
	fn settle(&self, value: T) -> Result<(), T> {
		let (value, listeners) = {
			let mut state = self.state.borrow_mut();
			if let State::Completed(_) = *state {
				return Err(value);
			}
			let value = Rc::new(value);
			let State::Pending { listeners, .. } =
				mem::replace(&mut *state, State::Completed(Rc::clone(&value)))
			else {
				unreachable!()
			};
			(value, listeners)
		};
		for (_, listener) in listeners {
			listener(&value);
		}
		Ok(())
	}

	fn listen(self: &Rc<Self>, listener: Listener<T>) -> Subscription
	where
		T: 'static,
	{
		if let Some(value) = self.value() {
			listener(&value);
			return Subscription::empty();
		}

		let id = match &mut *self.state.borrow_mut() {
			State::Pending { listeners, next_id } => {
				let id = *next_id;
				*next_id += 1;
				listeners.push((id, listener));
				id
			}
			State::Completed(_) => unreachable!(),
		};

		let cell = Rc::downgrade(self);
		Subscription::new(move || {
			if let Some(cell) = Weak::upgrade(&cell) {
				cell.forget(id);
			}
		})
	}

	fn forget(&self, id: u64) {
		let removed = match &mut *self.state.borrow_mut() {
			State::Pending { listeners, .. } => listeners
				.iter()
				.position(|(listener_id, _)| *listener_id == id)
				.map(|index| listeners.remove(index)),
			State::Completed(_) => None,
		};
		// Dropped outside the borrow, as listeners may own handles into this cell.
		drop(removed);
	}
}

/// The writable side of a [`Future`].
pub struct Promise<T> {
	cell: Rc<Cell<T>>,
}

/// The readable side of a [`Promise`]. Cheap to [`Clone`]; clones observe the same completion.
pub struct Future<T> {
	cell: Rc<Cell<T>>,
}

impl<T> Clone for Future<T> {
	fn clone(&self) -> Self {
		Self {
			cell: Rc::clone(&self.cell),
		}
	}
}

impl<T: Debug> Debug for Future<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Future").field(&self.cell.value()).finish()
	}
}

impl<T: Debug> Debug for Promise<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Promise").field(&self.cell.value()).finish()
	}
}

impl<T> Default for Promise<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Promise<T> {
	/// A fresh, uncompleted promise. Use [`future`](`Promise::future`) to hand out the readable side.
	#[must_use]
	pub fn new() -> Self {
		Self { cell: Cell::new() }
	}

	/// A readable handle to this promise's value.
	#[must_use]
	pub fn future(&self) -> Future<T> {
		Future {
			cell: Rc::clone(&self.cell),
		}
	}

	/// Completes the future with `value` and runs all pending callbacks in registration order.
	///
	/// # Errors
	///
	/// Iff the future was already completed. The future is left unchanged and the error
	/// carries both the existing and the rejected value.
	pub fn complete(&self, value: T) -> Result<(), AlreadyCompleted<T>> {
		self.cell.settle(value).map_err(|attempted| AlreadyCompleted {
			existing: self.cell.value().unwrap_or_else(|| unreachable!()),
			attempted,
		})
	}

	/// Like [`complete`](`Promise::complete`), but for callers that may race to complete.
	///
	/// **Returns** whether `value` was accepted. If not, it's dropped and nothing else happens.
	pub fn try_complete(&self, value: T) -> bool {
		self.cell.settle(value).is_ok()
	}

	/// Whether the future holds a value yet.
	#[must_use]
	pub fn is_completed(&self) -> bool {
		self.cell.value().is_some()
	}
}

impl<T: 'static> Future<T> {
	/// Creates a [`Promise`], lets `init` take it and returns its future.
	pub fn new(init: impl FnOnce(Promise<T>)) -> Self {
		let promise = Promise::new();
		let future = promise.future();
		init(promise);
		future
	}

	/// An already-completed future.
	pub fn successful(value: T) -> Self {
		let promise = Promise::new();
		promise.cell.settle(value).unwrap_or_else(|_| unreachable!());
		promise.future()
	}

	/// A future that can never complete.
	#[must_use]
	pub fn unfulfilled() -> Self {
		Promise::new().future()
	}

	/// Whether [`value`](`Future::value`) is available yet.
	#[must_use]
	pub fn is_completed(&self) -> bool {
		self.cell.value().is_some()
	}

	/// The completed value, if any.
	#[must_use]
	pub fn value(&self) -> Option<Rc<T>> {
		self.cell.value()
	}

	/// Runs `on_complete` with the value once it's available.
	///
	/// If the future is already completed, `on_complete` runs before this method returns
	/// and the returned [`Subscription`] is [`empty`](`Subscription::empty`).
	/// Otherwise, unsubscribing the returned handle before completion removes the callback.
	///
	/// Dropping the returned handle doesn't remove the callback.
	pub fn on_complete(&self, on_complete: impl 'static + FnOnce(&T)) -> Subscription {
		self.cell
			.listen(Box::new(move |value: &Rc<T>| on_complete(&**value)))
	}

	fn on_complete_rc(&self, on_complete: impl 'static + FnOnce(&Rc<T>)) {
		self.cell.listen(Box::new(on_complete)).detach();
	}

	/// A future completed with `f` of this future's value.
	pub fn map<U: 'static>(&self, f: impl 'static + FnOnce(&T) -> U) -> Future<U> {
		Future::new(|promise| {
			self.on_complete_rc(move |value| {
				promise.try_complete(f(&**value));
			});
		})
	}

	/// A future completed with (a clone of) the value of the future `f` returns for this future's value.
	pub fn flat_map<U: 'static + Clone>(
		&self,
		f: impl 'static + FnOnce(&T) -> Future<U>,
	) -> Future<U> {
		Future::new(|promise| {
			self.on_complete_rc(move |value| {
				f(&**value).on_complete_rc(move |value| {
					promise.try_complete(U::clone(&**value));
				});
			});
		})
	}

	/// A future completed with both values once both futures are.
	pub fn zip<U: 'static>(&self, other: &Future<U>) -> Future<(Rc<T>, Rc<U>)> {
		let other = other.clone();
		Future::new(|promise| {
			self.on_complete_rc(move |left| {
				let left = Rc::clone(left);
				other.on_complete_rc(move |right| {
					promise.try_complete((left, Rc::clone(right)));
				});
			});
		})
	}
}

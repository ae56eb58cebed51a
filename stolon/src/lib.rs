#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![allow(clippy::must_use_candidate)]
#![doc = include_str!("../README.md")]
//!
//! # Threading Notes
//!
//! Everything in this crate is single-threaded and `!Send`. Use a [`Scheduler`] to get work
//! from other threads onto the owning one.

mod diagnostics;
pub use diagnostics::{DiagnosticsRef, TracingDiagnostics};

pub mod future;
pub use future::{AlreadyCompleted, Future, Promise};

mod observable;
pub use observable::{Emitter, Observable};

pub mod scheduler;
pub use scheduler::{QueueScheduler, Scheduler};

mod slots;

mod subject;
pub use subject::Subject;

mod subscription;
pub use subscription::Subscription;

mod tracker;
pub use tracker::{DisposableScope, DisposableTracker};

/// Shadows each identifier with a [`Clone::clone`] of itself.
///
/// Useful to prepare captures for `move` closures.
///
/// ```
/// use std::rc::Rc;
/// use stolon::shadow_clone;
///
/// let a = Rc::new(1);
/// let f = {
/// 	shadow_clone!(a);
/// 	move || *a + 1
/// };
/// assert_eq!(f(), 2);
/// assert_eq!(Rc::strong_count(&a), 2);
/// ```
#[macro_export]
macro_rules! shadow_clone {
	($($ident:ident),*$(,)?) => {
		// Prevent warnings about unused mutability and single-element tuples.
		#[allow(unused_mut, unused_parens)]
		let ($(mut $ident),*) = ($(::core::clone::Clone::clone(&$ident)),*);
	};
}

use std::{cell::Cell, rc::Rc};

use proptest::prelude::*;
use stolon::{shadow_clone, Subject};

use _validator::Validator;

#[test]
fn reentrant_submission_waits_for_the_current_pass() {
	let v = Validator::new();
	let subject = Subject::<i32>::new();

	let mut a = subject.subscribe({
		shadow_clone!(v, subject);
		move |&n| {
			v.push(("a", n));
			if n == 0 {
				subject.submit(1);
			}
		}
	});
	let mut b = subject.subscribe({
		shadow_clone!(v);
		move |&n| v.push(("b", n))
	});

	subject.submit(0);
	v.expect([("a", 0), ("b", 0), ("a", 1), ("b", 1)]);

	assert!(a.unsubscribe());
	assert!(b.unsubscribe());
}

#[test]
fn queued_values_are_delivered_first_in_first_out() {
	let v = Validator::new();
	let subject = Subject::<i32>::new();

	let mut a = subject.subscribe({
		shadow_clone!(v, subject);
		move |&n| {
			v.push(("a", n));
			if n == 0 {
				subject.submit(1);
				subject.submit(2);
			}
		}
	});
	let mut b = subject.subscribe({
		shadow_clone!(v, subject);
		move |&n| {
			v.push(("b", n));
			if n == 0 {
				subject.submit(10);
			}
		}
	});

	subject.submit(0);
	v.expect([
		("a", 0),
		("b", 0),
		("a", 1),
		("b", 1),
		("a", 2),
		("b", 2),
		("a", 10),
		("b", 10),
	]);

	a.unsubscribe();
	b.unsubscribe();
}

#[test]
fn chained_reentrancy_stays_serialized() {
	let v = Validator::new();
	let subject = Subject::<i32>::new();

	let mut a = subject.subscribe({
		shadow_clone!(v, subject);
		move |&n| {
			v.push(("a", n));
			if n < 3 {
				subject.submit(n + 1);
			}
		}
	});
	let mut b = subject.subscribe({
		shadow_clone!(v);
		move |&n| v.push(("b", n))
	});

	subject.submit(0);
	v.expect((0..=3).flat_map(|n| [("a", n), ("b", n)]));

	a.unsubscribe();
	b.unsubscribe();
}

#[test]
fn other_observables_deliver_immediately() {
	let v = Validator::new();
	let x = Subject::<i32>::new();
	let y = Subject::<i32>::new();

	let mut x1 = x.subscribe({
		shadow_clone!(v, y);
		move |&n| {
			v.push(("x1", n));
			if n == 0 {
				y.submit(0);
			}
		}
	});
	let mut x2 = x.subscribe({
		shadow_clone!(v);
		move |&n| v.push(("x2", n))
	});
	let mut y1 = y.subscribe({
		shadow_clone!(v, x);
		move |&n| {
			v.push(("y1", n));
			x.submit(1);
		}
	});

	x.submit(0);
	v.expect([("x1", 0), ("y1", 0), ("x2", 0), ("x1", 1), ("x2", 1)]);

	x1.unsubscribe();
	x2.unsubscribe();
	y1.unsubscribe();
}

#[test]
fn no_subscribers_is_fine() {
	let subject = Subject::<i32>::new();
	subject.submit(1);
	assert_eq!(subject.subscribers(), 0);
}

proptest! {
	#[test]
	fn delivery_is_breadth_first(subscribers in 1usize..4, fanout in prop::collection::vec(0usize..3, 1..24)) {
		let v = Validator::new();
		let subject = Subject::<usize>::new();
		let next = Rc::new(Cell::new(1));

		let mut subscriptions = (0..subscribers)
			.map(|s| {
				subject.subscribe({
					shadow_clone!(v, subject, next, fanout);
					move |&id| {
						v.push((s, id));
						if s == 0 {
							for _ in 0..fanout[id] {
								if next.get() < fanout.len() {
									subject.submit(next.get());
									next.set(next.get() + 1);
								}
							}
						}
					}
				})
			})
			.collect::<Vec<_>>();

		subject.submit(0);

		let total = next.get();
		v.expect((0..total).flat_map(|id| (0..subscribers).map(move |s| (s, id))));

		for subscription in &mut subscriptions {
			prop_assert!(subscription.unsubscribe());
		}
	}
}

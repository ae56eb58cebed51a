use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

use stolon::{shadow_clone, Emitter, Observable, Subject, Subscription};

use _validator::Validator;

fn counted() -> (Observable<i32>, Rc<Cell<usize>>, Rc<Cell<usize>>) {
	let connects = Rc::new(Cell::new(0));
	let disconnects = Rc::new(Cell::new(0));
	let observable = Observable::from_source({
		shadow_clone!(connects, disconnects);
		move |_| {
			connects.set(connects.get() + 1);
			shadow_clone!(disconnects);
			Subscription::new(move || disconnects.set(disconnects.get() + 1))
		}
	});
	(observable, connects, disconnects)
}

#[test]
fn connects_once_per_activation() {
	let (observable, connects, disconnects) = counted();
	assert_eq!(connects.get(), 0);

	let mut a = observable.subscribe(|_| ());
	let mut b = observable.subscribe(|_| ());
	assert_eq!((connects.get(), disconnects.get()), (1, 0));

	a.unsubscribe();
	assert_eq!((connects.get(), disconnects.get()), (1, 0));

	b.unsubscribe();
	assert_eq!((connects.get(), disconnects.get()), (1, 1));

	let mut c = observable.subscribe(|_| ());
	assert_eq!((connects.get(), disconnects.get()), (2, 1));
	c.unsubscribe();
	assert_eq!((connects.get(), disconnects.get()), (2, 2));
}

#[test]
fn subscriptions_keep_their_observable_alive() {
	let (observable, connects, disconnects) = counted();
	let mut subscription = observable.subscribe(|_| ());
	drop(observable);
	assert_eq!((connects.get(), disconnects.get()), (1, 0));

	subscription.unsubscribe();
	assert_eq!((connects.get(), disconnects.get()), (1, 1));
}

#[test]
fn map_subscribes_upstream_lazily() {
	let v = Validator::new();
	let subject = Subject::<i32>::new();
	let doubled = subject.map(|n| n * 2);
	assert_eq!(subject.subscribers(), 0);

	let mut subscription = doubled.subscribe({
		shadow_clone!(v);
		move |&n| v.push(n)
	});
	assert_eq!(subject.subscribers(), 1);

	subject.submit(1);
	subject.submit(2);
	v.expect([2, 4]);

	subscription.unsubscribe();
	assert_eq!(subject.subscribers(), 0);

	subject.submit(3);
	v.expect([]);
}

#[test]
fn self_unsubscribe_disconnects_after_the_pass() {
	let v = Validator::new();
	let subject = Subject::<i32>::new();
	let own = Rc::new(RefCell::new(Subscription::empty()));

	*own.borrow_mut() = subject.map(|n| n + 1).subscribe({
		shadow_clone!(v, own);
		move |&n| {
			v.push(n);
			own.borrow_mut().unsubscribe();
		}
	});
	assert_eq!(subject.subscribers(), 1);

	subject.submit(1);
	v.expect([2]);
	assert_eq!(subject.subscribers(), 0);
}

#[test]
fn filter_and_filter_map() {
	let v = Validator::new();
	let subject = Subject::<i32>::new();

	let mut evens = subject.filter(|n| n % 2 == 0).subscribe({
		shadow_clone!(v);
		move |&n| v.push(("even", n))
	});
	let mut halves = subject
		.filter_map(|&n| (n % 2 == 0).then_some(n / 2))
		.subscribe({
			shadow_clone!(v);
			move |&n| v.push(("half", n))
		});

	for n in 1..=4 {
		subject.submit(n);
	}
	v.expect([("even", 2), ("half", 1), ("even", 4), ("half", 2)]);

	evens.unsubscribe();
	halves.unsubscribe();
	assert_eq!(subject.subscribers(), 0);
}

#[test]
fn merge() {
	let v = Validator::new();
	let left = Subject::<&str>::new();
	let right = Subject::<&str>::new();

	let mut merged = left.merge(&right).subscribe({
		shadow_clone!(v);
		move |&s| v.push(s)
	});
	assert_eq!((left.subscribers(), right.subscribers()), (1, 1));

	left.submit("l1");
	right.submit("r1");
	left.submit("l2");
	v.expect(["l1", "r1", "l2"]);

	merged.unsubscribe();
	assert_eq!((left.subscribers(), right.subscribers()), (0, 0));
}

#[test]
fn zip_pairs_latest_values() {
	let v = Validator::new();
	let numbers = Subject::<i32>::new();
	let letters = Subject::<char>::new();

	let zipped = numbers.zip(&letters);
	let mut subscription = zipped.subscribe({
		shadow_clone!(v);
		move |&pair| v.push(pair)
	});

	numbers.submit(1);
	v.expect([]);
	letters.submit('a');
	v.expect([(1, 'a')]);
	numbers.submit(2);
	v.expect([(2, 'a')]);
	letters.submit('b');
	v.expect([(2, 'b')]);

	subscription.unsubscribe();

	// Reconnecting starts over.
	let mut subscription = zipped.subscribe({
		shadow_clone!(v);
		move |&pair| v.push(pair)
	});
	letters.submit('c');
	v.expect([]);
	numbers.submit(3);
	v.expect([(3, 'c')]);
	subscription.unsubscribe();
}

#[test]
fn from_event_bridges_callback_registration() {
	let v = Validator::new();
	let registered = Rc::new(RefCell::new(None::<Emitter<u8>>));

	let events = Observable::from_event(
		{
			shadow_clone!(registered);
			move |emitter| *registered.borrow_mut() = Some(emitter)
		},
		{
			shadow_clone!(registered);
			move || *registered.borrow_mut() = None
		},
	);
	assert!(registered.borrow().is_none());

	let mut subscription = events.subscribe({
		shadow_clone!(v);
		move |&n| v.push(n)
	});
	let emitter = registered.borrow().clone().unwrap();
	emitter.submit(7);
	v.expect([7]);

	subscription.unsubscribe();
	assert!(registered.borrow().is_none());

	emitter.submit(8);
	v.expect([]);
}

#[test]
fn empty_never_emits() {
	let observable = Observable::<()>::empty();
	let mut subscription = observable.subscribe(|()| unreachable!());
	assert_eq!(observable.subscribers(), 1);
	subscription.unsubscribe();
}

use std::{cell::RefCell, thread};

use stolon::{Future, Promise, QueueScheduler, Scheduler};

struct Owner {
	promise: Promise<u32>,
}

#[test]
fn completes_on_the_owning_thread() {
	let scheduler = QueueScheduler::<Owner>::new();
	let owner = Owner {
		promise: Promise::new(),
	};
	let future: Future<u32> = owner.promise.future();

	thread::spawn({
		let scheduler = scheduler.clone();
		move || {
			let result = 6 * 7;
			scheduler.post(move |owner: &Owner| assert!(owner.promise.try_complete(result)));
		}
	})
	.join()
	.unwrap();
	assert!(!future.is_completed());

	assert_eq!(scheduler.run_pending(&owner), 1);
	assert_eq!(future.value().as_deref(), Some(&42));
	assert_eq!(scheduler.run_pending(&owner), 0);
}

#[test]
fn runs_in_posting_order_including_follow_ups() {
	let scheduler = QueueScheduler::<RefCell<Vec<u8>>>::new();
	let log = RefCell::new(Vec::new());

	let dyn_scheduler: &dyn Scheduler<_> = &scheduler;
	dyn_scheduler.run_on_owning_thread(Box::new(|log: &RefCell<Vec<u8>>| {
		log.borrow_mut().push(1);
	}));
	scheduler.post({
		let scheduler = scheduler.clone();
		move |log| {
			log.borrow_mut().push(2);
			scheduler.post(|log| log.borrow_mut().push(4));
		}
	});
	scheduler.post(|log| log.borrow_mut().push(3));
	assert_eq!(format!("{scheduler:?}"), "QueueScheduler { pending: 3 }");

	assert_eq!(scheduler.run_pending(&log), 4);
	assert_eq!(*log.borrow(), [1, 2, 3, 4]);
}

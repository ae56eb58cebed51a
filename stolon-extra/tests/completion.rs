use futures_lite::future::{block_on, poll_once};
use stolon::{Future, Promise};
use stolon_extra::future::completion;

#[test]
fn already_completed() {
	let future = Future::successful(3);
	assert_eq!(block_on(completion(&future)), Some(3));
}

#[test]
fn pending_until_completed() {
	let promise = Promise::new();
	let mut waiting = completion(&promise.future());

	assert_eq!(block_on(poll_once(&mut waiting)), None);

	promise.complete("done").unwrap();
	assert_eq!(block_on(waiting), Some("done"));
}

#[test]
fn resolves_to_none_when_abandoned() {
	let promise = Promise::<u8>::new();
	let waiting = completion(&promise.future());

	drop(promise);
	assert_eq!(block_on(waiting), None);
}

#[test]
fn dropping_removes_the_callback() {
	let promise = Promise::<u8>::new();
	drop(completion(&promise.future()));
	assert!(promise.try_complete(1));
}

#[test]
fn async_blocks() {
	let promise = Promise::new();
	let future = promise.future();

	let sum = async move {
		let a = completion(&future).await.unwrap_or_default();
		let b = completion(&future.map(|n: &i32| n * 10)).await.unwrap_or_default();
		a + b
	};

	promise.complete(4).unwrap();
	assert_eq!(block_on(sum), 44);
}

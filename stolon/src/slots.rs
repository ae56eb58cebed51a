//! Generation-checked liveness registry for subscription handles.
//!
//! Each subscriber record refers to its [`Subscription`](`crate::Subscription`) only through a
//! [`SlotKey`]. The handle updates its slot when it is released, detached or dropped, so the
//! record can tell whether anyone still owns the registration without holding a reference to it.
//!
//! Keys to removed slots stay detectably stale even after the index is reused.

/// Index plus generation. Only resolves while the slot it was issued for is still occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotKey {
	index: u32,
	generation: u32,
}

/// What became of the handle for an occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Liveness {
	/// The handle is alive and owned by someone.
	Held,
	/// The handle was given up on purpose via [`Subscription::detach`](`crate::Subscription::detach`).
	Detached,
	/// The handle was dropped while still subscribed.
	Abandoned,
}

#[derive(Debug)]
enum State {
	Vacant { next_free: Option<u32> },
	Occupied(Liveness),
}

#[derive(Debug)]
struct Entry {
	generation: u32,
	state: State,
}

#[derive(Debug, Default)]
pub(crate) struct Slots {
	entries: Vec<Entry>,
	free_head: Option<u32>,
	occupied: usize,
}

impl Slots {
	pub(crate) const fn new() -> Self {
		Self {
			entries: Vec::new(),
			free_head: None,
			occupied: 0,
		}
	}

	pub(crate) fn insert(&mut self) -> SlotKey {
		self.occupied += 1;
		if let Some(index) = self.free_head {
			let entry = &mut self.entries[index as usize];
			let State::Vacant { next_free } = entry.state else {
				unreachable!("Free list pointed at an occupied slot.")
			};
			self.free_head = next_free;
			entry.state = State::Occupied(Liveness::Held);
			SlotKey {
				index,
				generation: entry.generation,
			}
		} else {
			let index = u32::try_from(self.entries.len()).expect("Too many live subscriptions.");
			self.entries.push(Entry {
				generation: 0,
				state: State::Occupied(Liveness::Held),
			});
			SlotKey {
				index,
				generation: 0,
			}
		}
	}

	/// Resolves `key` iff its slot is still occupied by the same registration.
	pub(crate) fn get(&self, key: SlotKey) -> Option<Liveness> {
		match self.entries.get(key.index as usize) {
			Some(Entry {
				generation,
				state: State::Occupied(liveness),
			}) if *generation == key.generation => Some(*liveness),
			_ => None,
		}
	}

	fn transition(&mut self, key: SlotKey, to: Liveness) -> bool {
		match self.entries.get_mut(key.index as usize) {
			Some(Entry {
				generation,
				state: State::Occupied(liveness @ Liveness::Held),
			}) if *generation == key.generation => {
				*liveness = to;
				true
			}
			_ => false,
		}
	}

	/// Marks a [`Held`](`Liveness::Held`) slot as [`Abandoned`](`Liveness::Abandoned`).
	///
	/// **Returns** whether there was a change.
	pub(crate) fn abandon(&mut self, key: SlotKey) -> bool {
		self.transition(key, Liveness::Abandoned)
	}

	/// Marks a [`Held`](`Liveness::Held`) slot as [`Detached`](`Liveness::Detached`).
	///
	/// **Returns** whether there was a change.
	pub(crate) fn detach(&mut self, key: SlotKey) -> bool {
		self.transition(key, Liveness::Detached)
	}

	/// Vacates the slot and invalidates `key` (and any copies of it).
	///
	/// **Returns** whether `key` was still valid.
	pub(crate) fn remove(&mut self, key: SlotKey) -> bool {
		if self.get(key).is_none() {
			return false;
		}
		let entry = &mut self.entries[key.index as usize];
		entry.generation = entry.generation.wrapping_add(1);
		entry.state = State::Vacant {
			next_free: self.free_head,
		};
		self.free_head = Some(key.index);
		self.occupied -= 1;
		true
	}

	pub(crate) fn len(&self) -> usize {
		self.occupied
	}
}

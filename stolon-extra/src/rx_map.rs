use std::{
	collections::{hash_map, HashMap},
	fmt::{self, Debug, Formatter},
	hash::Hash,
	mem,
};

use stolon::{DiagnosticsRef, Observable, Subject, TracingDiagnostics};

/// How an entry of an [`RxMap`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change<V> {
	/// A new key was inserted with this value.
	Added(V),
	/// The key was removed. It last had this value.
	Removed(V),
	/// The key's value was replaced.
	Updated {
		/// The replaced value.
		old: V,
		/// The current value.
		new: V,
	},
}

impl<V> Change<V> {
	/// The value the entry holds after this change, if any.
	pub fn current(&self) -> Option<&V> {
		match self {
			Change::Added(value) | Change::Updated { new: value, .. } => Some(value),
			Change::Removed(_) => None,
		}
	}
}

/// A [`HashMap`] that announces its changes.
///
/// For each change, the specific observables emit before [`key_changed`](`RxMap::key_changed`):
///
/// | change  | emits on                     |
/// |---------|------------------------------|
/// | add     | `key_added`, then `key_set`  |
/// | update  | `key_set`                    |
/// | removal | `key_removed`                |
pub struct RxMap<K, V, D: DiagnosticsRef = TracingDiagnostics> {
	entries: HashMap<K, V>,
	key_added: Subject<(K, V), D>,
	key_removed: Subject<(K, V), D>,
	key_changed: Subject<(K, Change<V>), D>,
	key_set: Subject<(K, V), D>,
}

impl<K: Debug, V: Debug, D: DiagnosticsRef> Debug for RxMap<K, V, D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(&self.entries).finish()
	}
}

impl<K: 'static + Clone + Eq + Hash, V: 'static + Clone, D: 'static + DiagnosticsRef + Default> Default
	for RxMap<K, V, D>
{
	fn default() -> Self {
		Self::with_diagnostics(D::default())
	}
}

impl<K: 'static + Clone + Eq + Hash, V: 'static + Clone, D: 'static + DiagnosticsRef> RxMap<K, V, D> {
	/// An empty map.
	#[must_use]
	pub fn new() -> Self
	where
		D: Default,
	{
		Self::default()
	}

	/// An empty map whose observables report through `diagnostics`.
	pub fn with_diagnostics(diagnostics: D) -> Self {
		Self {
			entries: HashMap::new(),
			key_added: Subject::with_diagnostics(diagnostics.clone()),
			key_removed: Subject::with_diagnostics(diagnostics.clone()),
			key_changed: Subject::with_diagnostics(diagnostics.clone()),
			key_set: Subject::with_diagnostics(diagnostics),
		}
	}

	/// Emits the key and its new value when a key is inserted.
	pub fn key_added(&self) -> &Observable<(K, V), D> {
		&self.key_added
	}

	/// Emits the key and its last value when a key is removed.
	pub fn key_removed(&self) -> &Observable<(K, V), D> {
		&self.key_removed
	}

	/// Emits every change.
	pub fn key_changed(&self) -> &Observable<(K, Change<V>), D> {
		&self.key_changed
	}

	/// Emits the key and its new value when a key is inserted or updated.
	pub fn key_set(&self) -> &Observable<(K, V), D> {
		&self.key_set
	}

	/// Inserts or replaces the value for `key`.
	///
	/// **Returns** the previous value, if any.
	pub fn insert(&mut self, key: K, value: V) -> Option<V> {
		match self.entries.entry(key.clone()) {
			hash_map::Entry::Vacant(vacant) => {
				vacant.insert(value.clone());
				self.key_added.submit((key.clone(), value.clone()));
				self.key_set.submit((key.clone(), value.clone()));
				self.key_changed.submit((key, Change::Added(value)));
				None
			}
			hash_map::Entry::Occupied(mut occupied) => {
				let old = mem::replace(occupied.get_mut(), value.clone());
				self.key_set.submit((key.clone(), value.clone()));
				self.key_changed.submit((
					key,
					Change::Updated {
						old: old.clone(),
						new: value,
					},
				));
				Some(old)
			}
		}
	}

	/// Removes `key`.
	///
	/// **Returns** its value, if it was present.
	pub fn remove(&mut self, key: &K) -> Option<V> {
		let (key, value) = self.entries.remove_entry(key)?;
		self.announce_removal(key, value.clone());
		Some(value)
	}

	/// Removes all entries, announcing each removal.
	pub fn clear(&mut self) {
		for (key, value) in mem::take(&mut self.entries) {
			self.announce_removal(key, value);
		}
	}

	/// The value for `key`, if present.
	pub fn get(&self, key: &K) -> Option<&V> {
		self.entries.get(key)
	}

	/// Whether `key` is present.
	pub fn contains_key(&self, key: &K) -> bool {
		self.entries.contains_key(key)
	}

	/// The number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether the map has no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Iterates over the entries in arbitrary order.
	pub fn iter(&self) -> impl '_ + Iterator<Item = (&K, &V)> {
		self.entries.iter()
	}

	fn announce_removal(&self, key: K, value: V) {
		self.key_removed.submit((key.clone(), value.clone()));
		self.key_changed.submit((key, Change::Removed(value)));
	}
}

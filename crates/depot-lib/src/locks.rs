//! In-process locking of package versions.
//!
//! Locking is advisory: it gates the planning and execution entry
//! points of this process, not the filesystem. Locks never block, a
//! second attempt on a held id fails immediately.

use std::collections::HashSet;
use std::sync::Mutex;

/// Exclusive membership set keyed by package version string id.
#[derive(Debug, Default)]
pub struct LockRegistry {
	locked: Mutex<HashSet<String>>,
}

impl LockRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Acquires `id`. Fails with [`crate::Error::Locked`] if it is already held; never waits.
	pub fn lock(&self, id: &str) -> crate::Result<()> {
		let mut locked = self.locked.lock().expect("lock registry mutex poisoned");
		if locked.contains(id) {
			return Err(crate::Error::Locked(id.to_string()));
		}
		log::trace!("Locking {}", id);
		locked.insert(id.to_string());
		Ok(())
	}

	/// Releases `id`. A no-op when the id is not held.
	pub fn unlock(&self, id: &str) {
		log::trace!("Unlocking {}", id);
		self.locked.lock().expect("lock registry mutex poisoned").remove(id);
	}

	pub fn is_locked(&self, id: &str) -> bool {
		self.locked.lock().expect("lock registry mutex poisoned").contains(id)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn second_lock_fails_without_blocking() {
		let registry = LockRegistry::new();
		registry.lock("a.B/1.0").unwrap();
		assert!(matches!(registry.lock("a.B/1.0"), Err(crate::Error::Locked(_))));
		/* other ids are unaffected */
		registry.lock("a.B/1.1").unwrap();
	}

	#[test]
	fn unlock_allows_relock() {
		let registry = LockRegistry::new();
		registry.lock("a.B/1.0").unwrap();
		registry.unlock("a.B/1.0");
		assert!(!registry.is_locked("a.B/1.0"));
		registry.lock("a.B/1.0").unwrap();
	}

	#[test]
	fn unlock_of_unknown_id_is_a_noop() {
		LockRegistry::new().unlock("a.B/1.0");
	}
}

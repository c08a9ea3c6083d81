//! Process-wide refcounted cache mapping device identity to screen.
//!
//! The registry exists because callers may hold many distinct fds (dup'd,
//! re-opened, inherited) that all refer to the same physical device, and the
//! screen for a device must be constructed at most once. Entries live exactly
//! as long as their reference count is positive; there is no eviction policy
//! and the registry itself is never torn down.
//!
//! # Thread safety
//!
//! A single `parking_lot::Mutex` guards the map structure and each entry's
//! refcount, and nothing else. Screen construction and teardown always run
//! with the mutex released, so slow device I/O never blocks unrelated
//! identities and a constructor that re-enters the registry cannot deadlock.

use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::error::Result;
use crate::identity::DeviceIdentity;

/// An expensive device-bound resource shared across acquirers.
///
/// `close` is the resource's real teardown. Callers never invoke it
/// directly: dropping a [`SharedScreen`] releases one registry reference,
/// and the registry runs `close` once the last reference for the device is
/// gone. The screen implementation itself stays unaware that it is shared.
pub trait Screen: Any + Send + Sync {
    /// Tear the screen down. Invoked exactly once, by the registry, after
    /// the last [`SharedScreen`] for the device is dropped.
    fn close(&self);
}

struct Entry {
    screen: Arc<dyn Screen>,
    refcnt: usize,
}

/// Refcounted cache of screens, keyed by canonical device identity.
///
/// At most one entry exists per identity, an entry is present iff its
/// refcount is positive, and the refcount equals the number of outstanding
/// [`SharedScreen`] guards for that identity.
pub struct ScreenRegistry {
    entries: Mutex<HashMap<DeviceIdentity, Entry>>,
}

impl ScreenRegistry {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    /// Acquire the screen for `identity`, constructing it if absent.
    ///
    /// `construct` runs with the mutex released. On failure nothing is
    /// inserted and the error propagates. Two threads may therefore race to
    /// construct for the same fresh identity; the first to re-lock wins,
    /// and the loser's screen is closed without ever being registered.
    pub fn acquire<F>(&self, identity: DeviceIdentity, construct: F) -> Result<SharedScreen<'_>>
    where
        F: FnOnce() -> Result<Arc<dyn Screen>>,
    {
        {
            let mut entries = self.entries.lock();
            if let Some(entry) = entries.get_mut(&identity) {
                entry.refcnt += 1;
                tracing::debug!(?identity, refcnt = entry.refcnt, "screen cache hit");
                return Ok(SharedScreen { screen: Arc::clone(&entry.screen), identity, registry: self });
            }
        }

        let screen = construct()?;

        let (screen, race_loser) = {
            let mut entries = self.entries.lock();
            match entries.entry(identity) {
                hash_map::Entry::Occupied(mut occupied) => {
                    // Another thread registered while we were constructing;
                    // its screen wins, ours is discarded below.
                    let entry = occupied.get_mut();
                    entry.refcnt += 1;
                    (Arc::clone(&entry.screen), Some(screen))
                }
                hash_map::Entry::Vacant(vacant) => {
                    vacant.insert(Entry { screen: Arc::clone(&screen), refcnt: 1 });
                    (screen, None)
                }
            }
        };

        match race_loser {
            Some(loser) => {
                tracing::debug!(?identity, "discarding screen that lost the construction race");
                loser.close();
            }
            None => tracing::debug!(?identity, "screen registered"),
        }

        Ok(SharedScreen { screen, identity, registry: self })
    }

    /// Drop one reference to `identity`'s entry, tearing the screen down on
    /// the last one. Reached only from [`SharedScreen::drop`].
    fn release(&self, identity: DeviceIdentity) {
        let evicted = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(&identity) else {
                debug_assert!(false, "release without a registry entry");
                return;
            };
            entry.refcnt -= 1;
            if entry.refcnt == 0 {
                entries.remove(&identity).map(|entry| entry.screen)
            } else {
                None
            }
        };

        // Teardown runs outside the lock.
        if let Some(screen) = evicted {
            tracing::debug!(?identity, "last reference dropped, closing screen");
            screen.close();
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    #[cfg(test)]
    pub(crate) fn refcount(&self, identity: DeviceIdentity) -> Option<usize> {
        self.entries.lock().get(&identity).map(|entry| entry.refcnt)
    }
}

impl Default for ScreenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to a registered screen.
///
/// Holds one registry reference. Dropping the guard releases it; the
/// registry closes the underlying screen once the last guard for the device
/// is gone. This is the only teardown path.
pub struct SharedScreen<'r> {
    screen: Arc<dyn Screen>,
    identity: DeviceIdentity,
    registry: &'r ScreenRegistry,
}

impl SharedScreen<'_> {
    /// Identity of the device this screen is bound to.
    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    /// Downcast to the driver's concrete screen type.
    pub fn downcast_ref<S: Screen>(&self) -> Option<&S> {
        (&*self.screen as &dyn Any).downcast_ref()
    }
}

impl Deref for SharedScreen<'_> {
    type Target = dyn Screen;

    fn deref(&self) -> &Self::Target {
        &*self.screen
    }
}

impl Drop for SharedScreen<'_> {
    fn drop(&mut self) {
        self.registry.release(self.identity);
    }
}

impl fmt::Debug for SharedScreen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedScreen").field("identity", &self.identity).finish_non_exhaustive()
    }
}

/// Global screen registry instance, created on first use.
static REGISTRY: Lazy<ScreenRegistry> = Lazy::new(ScreenRegistry::new);

/// Get the process-wide screen registry.
pub fn registry() -> &'static ScreenRegistry {
    &REGISTRY
}

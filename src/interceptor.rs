//! Interceptor registries.
//!
//! Interceptors wrap dispatch the way promise chains do: each entry has
//! a fulfilled handler and an optional rejected handler, and a rejected
//! handler that returns `Ok` recovers the chain. Request interceptors
//! run in reverse registration order (the most recently registered sees
//! the config first); response interceptors run in registration order.
//!
//! Registration hands back an [`InterceptorId`] for later removal.
//! Removed slots keep their index, so ids stay valid across removals.

use std::sync::Arc;

use crate::error::Error;

/// Fulfilled-path handler: maps a value onwards, or rejects the chain.
pub type InterceptorFn<V> = Arc<dyn Fn(V) -> crate::Result<V> + Send + Sync>;

/// Rejected-path handler: observes an error and either recovers with a
/// value or rethrows.
pub type RecoveryFn<V> = Arc<dyn Fn(Error) -> crate::Result<V> + Send + Sync>;

/// Handle returned by [`InterceptorManager::register()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterceptorId(usize);

struct Entry<V> {
    fulfilled: InterceptorFn<V>,
    rejected: Option<RecoveryFn<V>>,
}

/// An ordered set of interceptors over values of type `V`.
///
/// `V` is [`RequestConfig`](crate::RequestConfig) for the request chain
/// and [`Response`](crate::Response) for the response chain.
pub struct InterceptorManager<V> {
    slots: Vec<Option<Entry<V>>>,
}

impl<V> Default for InterceptorManager<V> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<V> InterceptorManager<V> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a fulfilled-path interceptor.
    pub fn register<F>(&mut self, fulfilled: F) -> InterceptorId
    where
        F: Fn(V) -> crate::Result<V> + Send + Sync + 'static,
    {
        self.push(Arc::new(fulfilled), None)
    }

    /// Register an interceptor with a rejected-path handler.
    ///
    /// The rejected handler sees errors produced by earlier links in the
    /// chain (and, for response interceptors, by dispatch itself); it
    /// may recover by returning `Ok`.
    pub fn register_catch<F, R>(&mut self, fulfilled: F, rejected: R) -> InterceptorId
    where
        F: Fn(V) -> crate::Result<V> + Send + Sync + 'static,
        R: Fn(Error) -> crate::Result<V> + Send + Sync + 'static,
    {
        self.push(Arc::new(fulfilled), Some(Arc::new(rejected)))
    }

    fn push(&mut self, fulfilled: InterceptorFn<V>, rejected: Option<RecoveryFn<V>>) -> InterceptorId {
        let id = InterceptorId(self.slots.len());
        self.slots.push(Some(Entry { fulfilled, rejected }));
        id
    }

    /// Remove a previously registered interceptor.
    ///
    /// Returns whether the id named a live entry. Other ids are
    /// unaffected.
    pub fn eject(&mut self, id: InterceptorId) -> bool {
        match self.slots.get_mut(id.0) {
            Some(slot @ Some(_)) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Remove every interceptor.
    ///
    /// Slots are emptied in place, so ids issued before the clear stay
    /// dead instead of aliasing later registrations.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    /// Visit the live interceptors in registration order.
    ///
    /// The visitor receives each entry's id together with its fulfilled
    /// handler and, when one was registered, its rejected handler.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(InterceptorId, &InterceptorFn<V>, Option<&RecoveryFn<V>>),
    {
        for (index, entry) in self.slots.iter().enumerate() {
            if let Some(entry) = entry {
                visit(InterceptorId(index), &entry.fulfilled, entry.rejected.as_ref());
            }
        }
    }

    /// Number of live interceptors.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether no interceptors are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone the live handlers in registration order. Dispatch snapshots
    /// the chain up front so registrations during a request do not
    /// affect it.
    pub(crate) fn snapshot_live(&self) -> Vec<(InterceptorFn<V>, Option<RecoveryFn<V>>)> {
        self.slots
            .iter()
            .flatten()
            .map(|entry| (entry.fulfilled.clone(), entry.rejected.clone()))
            .collect()
    }
}

impl<V> std::fmt::Debug for InterceptorManager<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorManager")
            .field("live", &self.len())
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(suffix: &'static str) -> impl Fn(String) -> crate::Result<String> {
        move |mut v: String| {
            v.push_str(suffix);
            Ok(v)
        }
    }

    fn run_chain(manager: &InterceptorManager<String>, seed: &str) -> crate::Result<String> {
        let mut acc: crate::Result<String> = Ok(seed.to_owned());
        for (fulfilled, rejected) in manager.snapshot_live() {
            acc = match acc {
                Ok(v) => fulfilled(v),
                Err(e) => match rejected {
                    Some(recover) => recover(e),
                    None => Err(e),
                },
            };
        }
        acc
    }

    #[test]
    fn snapshot_preserves_registration_order() {
        let mut manager = InterceptorManager::new();
        manager.register(tag(".a"));
        manager.register(tag(".b"));
        manager.register(tag(".c"));

        assert_eq!(run_chain(&manager, "seed").unwrap(), "seed.a.b.c");
    }

    #[test]
    fn eject_removes_without_shifting_ids() {
        let mut manager = InterceptorManager::new();
        let a = manager.register(tag(".a"));
        let b = manager.register(tag(".b"));
        let c = manager.register(tag(".c"));

        assert!(manager.eject(b));
        assert_eq!(manager.len(), 2);
        assert_eq!(run_chain(&manager, "seed").unwrap(), "seed.a.c");

        // a and c are still addressable by their original ids.
        assert!(manager.eject(a));
        assert!(manager.eject(c));
        assert!(manager.is_empty());
    }

    #[test]
    fn eject_is_idempotent_and_bounds_checked() {
        let mut manager: InterceptorManager<String> = InterceptorManager::new();
        let id = manager.register(tag(".x"));

        assert!(manager.eject(id));
        assert!(!manager.eject(id), "second eject is a no-op");
        assert!(!manager.eject(InterceptorId(99)), "unknown id is a no-op");
    }

    #[test]
    fn rejected_handler_recovers_the_chain() {
        let mut manager = InterceptorManager::new();
        manager.register(|_: String| Err(crate::Error::transport("boom")));
        manager.register_catch(tag(".never"), |e| Ok(format!("recovered:{e}")));
        manager.register(tag(".after"));

        assert_eq!(run_chain(&manager, "seed").unwrap(), "recovered:boom.after");
    }

    #[test]
    fn error_skips_entries_without_rejected_handler() {
        let mut manager = InterceptorManager::new();
        manager.register(|_: String| Err(crate::Error::transport("boom")));
        manager.register(tag(".skipped"));

        let err = run_chain(&manager, "seed").unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn for_each_skips_ejected_slots() {
        let mut manager = InterceptorManager::new();
        let a = manager.register(tag(".a"));
        let b = manager.register_catch(tag(".b"), Err);
        let c = manager.register(tag(".c"));
        assert!(manager.eject(c));

        let mut seen = Vec::new();
        manager.for_each(|id, _fulfilled, rejected| seen.push((id, rejected.is_some())));
        assert_eq!(seen, vec![(a, false), (b, true)]);
    }

    #[test]
    fn clear_drops_everything() {
        let mut manager = InterceptorManager::new();
        manager.register(tag(".a"));
        manager.register(tag(".b"));
        manager.clear();
        assert!(manager.is_empty());
        assert_eq!(run_chain(&manager, "seed").unwrap(), "seed");
    }

    #[test]
    fn clear_does_not_recycle_ids() {
        let mut manager = InterceptorManager::new();
        let stale = manager.register(tag(".a"));
        manager.clear();

        let fresh = manager.register(tag(".b"));
        assert_ne!(stale, fresh);
        assert!(!manager.eject(stale), "pre-clear id names no live entry");
        assert_eq!(manager.len(), 1);
        assert_eq!(run_chain(&manager, "seed").unwrap(), "seed.b");
        assert!(manager.eject(fresh));
    }
}

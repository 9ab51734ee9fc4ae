//! Redirect policy.
//!
//! Provides a [`Policy`](crate::redirect::Policy) type carried on every
//! [`TransportRequest`](crate::TransportRequest). Transports own the
//! redirect loop; the policy tells them whether to follow redirects at
//! all and how many hops to allow before giving up with a
//! [`redirect`](crate::Error::is_redirect) error.

/// A redirect policy.
///
/// Built by the dispatch layer from `max_redirects` in the request
/// config: `Some(0)` becomes [`none()`](Policy::none), `Some(n)`
/// becomes [`limited(n)`](Policy::limited), and an unset limit falls
/// back to [`Policy::default()`].
#[derive(Debug, Clone)]
pub struct Policy {
    inner: PolicyInner,
}

#[derive(Debug, Clone)]
enum PolicyInner {
    /// Follow redirects (up to a maximum count).
    Limited(u32),
    /// Never follow redirects.
    None,
}

impl Policy {
    /// Follow redirects up to a maximum count.
    pub fn limited(max: usize) -> Self {
        // Saturate to u32::MAX rather than silently truncating.
        // In practice values above a few hundred are meaningless.
        let clamped = u32::try_from(max).unwrap_or(u32::MAX);
        Self {
            inner: PolicyInner::Limited(clamped),
        }
    }

    /// Never follow redirects; 3xx responses settle like any other.
    pub fn none() -> Self {
        Self {
            inner: PolicyInner::None,
        }
    }

    /// The redirect budget for a transport.
    ///
    /// `None` means redirects must not be followed. `Some(n)` allows up
    /// to `n` hops; a transport that needs hop `n + 1` reports a
    /// redirect error instead.
    pub fn max_redirects(&self) -> Option<usize> {
        match self.inner {
            PolicyInner::Limited(n) => Some(n as usize),
            PolicyInner::None => None,
        }
    }
}

impl Default for Policy {
    /// Create the default redirect policy (follow up to 21 redirects).
    fn default() -> Self {
        Self::limited(21)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_construction() {
        // (label, policy, expected max_redirects)
        let cases: Vec<(&str, Policy, Option<usize>)> = vec![
            ("limited(5)", Policy::limited(5), Some(5)),
            ("none", Policy::none(), None),
            ("default", Policy::default(), Some(21)),
            ("limited(0)", Policy::limited(0), Some(0)),
            (
                "limited(usize::MAX) saturates",
                Policy::limited(usize::MAX),
                Some(u32::MAX as usize),
            ),
        ];

        for (label, policy, expected) in &cases {
            assert_eq!(policy.max_redirects(), *expected, "Policy::{label}");
        }
    }

    #[test]
    fn policy_clone() {
        let p = Policy::limited(3);
        let p2 = p.clone();
        assert_eq!(p.max_redirects(), Some(3));
        assert_eq!(p2.max_redirects(), Some(3));
    }

    #[test]
    fn policy_debug() {
        let p = Policy::none();
        let s = format!("{p:?}");
        assert!(s.contains("None"));
    }
}

//! Analysis session state.
//!
//! A session owns the noise-identity counter. Two noise terms with the same
//! identity are realisations of the same random process and add
//! algebraically; different identities add in quadrature.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Noise identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Nid(pub u64);

impl fmt::Display for Nid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct Session {
    next_nid: AtomicU64,
}

impl Session {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Process-wide default session.
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<Session>> = OnceLock::new();
        SHARED.get_or_init(Session::new).clone()
    }

    /// Allocates a fresh noise identity.
    pub fn next_nid(&self) -> Nid {
        Nid(self.next_nid.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nids_are_unique_and_increasing() {
        let session = Session::new();
        let a = session.next_nid();
        let b = session.next_nid();
        assert!(b > a);
        assert_ne!(a, b);
    }

    #[test]
    fn test_sessions_are_independent() {
        let a = Session::new();
        let b = Session::new();
        assert_eq!(a.next_nid(), b.next_nid());
    }

    #[test]
    fn test_concurrent_allocation() {
        let session = Session::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let s = session.clone();
                std::thread::spawn(move || (0..100).map(|_| s.next_nid()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<Nid> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 400);
    }
}

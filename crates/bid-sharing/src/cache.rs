//! Memoization of optimization results.
//!
//! Results are keyed by a fingerprint of the placement codes and the ids of
//! the received bids. Both the fingerprint function and the backing store
//! are injected, so callers decide on scope and eviction.

use {
    crate::{
        domain::{Auction, Bid, Placement},
        optimizer::Optimizer,
        outcome::Outcome,
        strategy::Strategies,
    },
    cached::{Cached, SizedCache},
    dashmap::DashMap,
    sha2::{Digest, Sha256},
    std::{
        fmt,
        sync::{Mutex, PoisonError},
    },
};

/// Stable key derived from the contents of an auction.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub [u8; 32]);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

pub trait Fingerprinter {
    fn fingerprint(&self, placements: &[Placement], bids: &[Bid]) -> Fingerprint;
}

/// SHA-256 over the sorted placement codes followed by the sorted ad ids.
/// Every list and string is length prefixed so that different inputs can't
/// produce the same byte stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Fingerprinter;

fn u64_be(x: usize) -> [u8; 8] {
    u64::try_from(x).unwrap_or(u64::MAX).to_be_bytes()
}

fn encode_sorted<'a>(buf: &mut Vec<u8>, items: impl Iterator<Item = &'a str>) {
    let mut items: Vec<_> = items.collect();
    items.sort_unstable();
    buf.extend_from_slice(&u64_be(items.len()));
    for item in items {
        buf.extend_from_slice(&u64_be(item.len()));
        buf.extend_from_slice(item.as_bytes());
    }
}

impl Fingerprinter for Sha256Fingerprinter {
    fn fingerprint(&self, placements: &[Placement], bids: &[Bid]) -> Fingerprint {
        let mut buf = Vec::new();
        encode_sorted(&mut buf, placements.iter().map(Placement::as_str));
        encode_sorted(&mut buf, bids.iter().map(|bid| bid.ad_id.as_str()));
        Fingerprint(Sha256::digest(&buf).into())
    }
}

/// Where cached results live. Implementations must tolerate concurrent use;
/// when two callers race on the same key the last write wins.
pub trait Store {
    fn get(&self, key: &Fingerprint) -> Option<Vec<Bid>>;
    fn insert(&self, key: Fingerprint, value: Vec<Bid>);
}

/// Unbounded store, entries live as long as the map.
pub type UnboundedStore = DashMap<Fingerprint, Vec<Bid>>;

impl Store for UnboundedStore {
    fn get(&self, key: &Fingerprint) -> Option<Vec<Bid>> {
        DashMap::get(self, key).map(|entry| entry.value().clone())
    }

    fn insert(&self, key: Fingerprint, value: Vec<Bid>) {
        DashMap::insert(self, key, value);
    }
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn get(&self, key: &Fingerprint) -> Option<Vec<Bid>> {
        (**self).get(key)
    }

    fn insert(&self, key: Fingerprint, value: Vec<Bid>) {
        (**self).insert(key, value)
    }
}

/// Store holding at most a fixed number of entries, evicting the least
/// recently used.
pub struct BoundedStore(Mutex<SizedCache<Fingerprint, Vec<Bid>>>);

impl BoundedStore {
    pub fn new(capacity: usize) -> Self {
        Self(Mutex::new(SizedCache::with_size(capacity.max(1))))
    }
}

impl Store for BoundedStore {
    fn get(&self, key: &Fingerprint) -> Option<Vec<Bid>> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cache_get(key)
            .cloned()
    }

    fn insert(&self, key: Fingerprint, value: Vec<Bid>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cache_set(key, value);
    }
}

/// Result of a cached optimization.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// An identical auction was optimized before, these are its winning
    /// bids.
    Hit(Vec<Bid>),
    /// The auction was optimized now.
    Miss(Outcome),
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn winning_bids(&self) -> &[Bid] {
        match self {
            Lookup::Hit(bids) => bids,
            Lookup::Miss(outcome) => &outcome.winning_bids,
        }
    }

    pub fn into_winning_bids(self) -> Vec<Bid> {
        match self {
            Lookup::Hit(bids) => bids,
            Lookup::Miss(outcome) => outcome.winning_bids,
        }
    }
}

/// [`Optimizer`] that remembers the winning bids of every auction it has
/// optimized.
pub struct CachedOptimizer<F = Sha256Fingerprinter, S = UnboundedStore> {
    optimizer: Optimizer,
    fingerprinter: F,
    store: S,
}

impl CachedOptimizer {
    /// Cache with the default fingerprint and an unbounded store.
    pub fn unbounded(optimizer: Optimizer) -> Self {
        Self::new(optimizer, Sha256Fingerprinter, UnboundedStore::new())
    }
}

impl<F, S> CachedOptimizer<F, S>
where
    F: Fingerprinter,
    S: Store,
{
    pub fn new(optimizer: Optimizer, fingerprinter: F, store: S) -> Self {
        Self {
            optimizer,
            fingerprinter,
            store,
        }
    }

    pub fn optimize(&self, auction: &Auction, strategies: Strategies<'_>) -> Lookup {
        if strategies.eligibility.is_none() {
            return Lookup::Miss(self.optimizer.optimize(auction, strategies));
        }

        let key = self
            .fingerprinter
            .fingerprint(&auction.placements, &auction.bids_received);
        if let Some(bids) = self.store.get(&key) {
            tracing::debug!(fingerprint = %key, "using cached winning bids");
            return Lookup::Hit(bids);
        }

        let outcome = self.optimizer.optimize(auction, strategies);
        if !outcome.decision.is_skipped() {
            self.store.insert(key, outcome.winning_bids.clone());
        }
        Lookup::Miss(outcome)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{config::Config, strategy::Eligibility},
    };

    fn auction() -> Auction {
        Auction {
            original_winning_bids: vec![Bid::new("1", "A", 2.0), Bid::new("2", "B", 8.0)],
            placements: vec!["A".into(), "B".into()],
            bids_received: vec![
                Bid::new("1", "A", 2.0),
                Bid::new("2", "B", 8.0),
                Bid::new("3", "B", 5.0),
            ],
        }
    }

    fn anything(_: &Placement, _: &Bid) -> bool {
        true
    }

    #[test]
    fn fingerprint_ignores_order() {
        let auction = auction();
        let mut shuffled = auction.clone();
        shuffled.placements.reverse();
        shuffled.bids_received.reverse();

        let fingerprinter = Sha256Fingerprinter;
        assert_eq!(
            fingerprinter.fingerprint(&auction.placements, &auction.bids_received),
            fingerprinter.fingerprint(&shuffled.placements, &shuffled.bids_received),
        );

        shuffled.bids_received.pop();
        assert_ne!(
            fingerprinter.fingerprint(&auction.placements, &auction.bids_received),
            fingerprinter.fingerprint(&shuffled.placements, &shuffled.bids_received),
        );
    }

    #[test]
    fn fingerprint_separates_codes() {
        let fingerprinter = Sha256Fingerprinter;
        assert_ne!(
            fingerprinter.fingerprint(&["ab".into(), "c".into()], &[]),
            fingerprinter.fingerprint(&["a".into(), "bc".into()], &[]),
        );
    }

    #[test]
    fn second_identical_call_hits() {
        let optimizer = CachedOptimizer::unbounded(Optimizer::new(Config::default()));
        let eligibility: &dyn Eligibility = &anything;

        let first = optimizer.optimize(&auction(), Strategies::new(eligibility));
        assert!(!first.is_hit());

        // fresh instances carrying equal values
        let second = optimizer.optimize(&auction(), Strategies::new(eligibility));
        assert!(second.is_hit());
        assert_eq!(first.winning_bids(), second.winning_bids());
    }

    #[test]
    fn skipped_auctions_are_not_cached() {
        let optimizer = CachedOptimizer::unbounded(Optimizer::new(Config::default()));

        let first = optimizer.optimize(&auction(), Strategies::default());
        let second = optimizer.optimize(&auction(), Strategies::default());

        assert!(!first.is_hit());
        assert!(!second.is_hit());
        assert_eq!(second.winning_bids(), auction().original_winning_bids);
    }

    #[test]
    fn bounded_store_evicts() {
        let store = BoundedStore::new(1);
        let (a, b) = (Fingerprint([1; 32]), Fingerprint([2; 32]));

        store.insert(a, vec![Bid::new("1", "A", 1.0)]);
        store.insert(b, vec![Bid::new("2", "B", 1.0)]);

        assert_eq!(store.get(&a), None);
        assert_eq!(store.get(&b), Some(vec![Bid::new("2", "B", 1.0)]));
    }
}

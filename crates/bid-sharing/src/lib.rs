//! Bid reassignment across placements.
//!
//! Given the bids received in a header-bidding auction, the placements (ad
//! units) of the page and a predicate deciding which bids may fill which
//! placement, this crate computes the assignment of bids to placements with
//! the highest total value. Optionally the strongest bids are then moved to
//! the highest priority placements. The result only replaces the original
//! winning bids if the configured acceptance policy agrees.

pub mod cache;
pub mod config;
pub mod domain;
pub mod lap;
pub mod matrix;
pub mod optimizer;
pub mod outcome;
pub mod reconcile;
pub mod strategy;

pub use {
    cache::{
        BoundedStore,
        CachedOptimizer,
        Fingerprint,
        Fingerprinter,
        Lookup,
        Sha256Fingerprinter,
        Store,
        UnboundedStore,
    },
    config::{AcceptancePolicy, Config, Reconciliation},
    domain::{AdId, Assignment, Auction, Bid, Placement},
    optimizer::Optimizer,
    outcome::{ChangeStatus, ChangeSummary, Decision, Difference, Outcome, SkipReason},
    strategy::{DepthPriority, Eligibility, ExactPlacement, Priority, SharedDepthPool, Strategies},
};

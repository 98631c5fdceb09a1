//! Generalized bid reassignment.
//!
//! Implements the optimization in 3 phases:
//! 1. maximize the total value of the winning bids among eligible
//!    (placement, bid) pairs
//! 2. either push the strongest winners onto the highest priority placements
//!    or, without a priority function, move winners back to the placements
//!    they were submitted for
//! 3. compare against the baseline and keep whichever is acceptable
//!
//! Phases 1 and 2 are both linear assignment problems solved on square
//! matrices, see [`crate::matrix`] and [`crate::lap`].

use {
    crate::{
        config::{Config, Reconciliation},
        domain::{Assignment, Auction, Bid, Placement},
        lap,
        matrix::ValueMatrix,
        outcome::{self, Decision, Difference, Outcome, SkipReason},
        reconcile,
        strategy::{Eligibility, Priority, Strategies},
    },
    itertools::Itertools,
    std::collections::HashSet,
};

/// Reassigns bids across placements.
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: Config,
}

impl Optimizer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the optimization for one auction.
    ///
    /// Never fails: whenever there is nothing to optimize or the result isn't
    /// good enough the baseline comes back untouched. Inputs are never
    /// modified; accepted bids are returned as copies carrying their new
    /// placement.
    pub fn optimize(&self, auction: &Auction, strategies: Strategies<'_>) -> Outcome {
        let Some(eligibility) = strategies.eligibility else {
            tracing::debug!("no eligibility predicate, keeping original winning bids");
            return Outcome::skipped(
                &auction.original_winning_bids,
                SkipReason::NoEligibilityPredicate,
            );
        };
        if auction.placements.is_empty() {
            return Outcome::skipped(&auction.original_winning_bids, SkipReason::NoPlacements);
        }
        if auction.bids_received.is_empty() {
            return Outcome::skipped(&auction.original_winning_bids, SkipReason::NoBids);
        }

        let placements: Vec<Placement> = auction.placements.iter().unique().cloned().collect();
        let bids: Vec<Bid> = auction
            .bids_received
            .iter()
            .unique_by(|bid| &bid.ad_id)
            .cloned()
            .collect();
        let original = auction.original_assignment();
        tracing::debug!(?original, "original winning bids");

        let by_value = self.maximize_value(&placements, &bids, eligibility);
        let reassigned = match strategies.priority {
            Some(priority) => self.prioritize(&placements, by_value, eligibility, priority),
            None => self.reconcile(&placements, &original, by_value, eligibility),
        };

        let difference = Difference::between(&reassigned, &original);
        let changes = outcome::change_summaries(&placements, &reassigned, &original);
        let accepted = self
            .config
            .acceptance
            .accepts(difference.gain_amount, difference.gain_ratio);
        tracing::debug!(?changes, ?reassigned, "change summary versus original");
        tracing::info!(
            accepted,
            gain_amount = difference.gain_amount,
            gain_ratio = ?difference.gain_ratio,
            original_total = difference.original_total,
            reassigned_total = difference.reassigned_total,
            "optimized bid assignment"
        );

        if accepted {
            Outcome {
                winning_bids: reassigned.into_winning_bids(),
                decision: Decision::Accepted,
                difference: Some(difference),
                changes,
            }
        } else {
            Outcome {
                winning_bids: auction.original_winning_bids.clone(),
                decision: Decision::Rejected,
                difference: Some(difference),
                changes,
            }
        }
    }

    /// Finds the placement -> bid matching with the highest total value among
    /// eligible pairs. Placements without an eligible bid stay empty.
    fn maximize_value(
        &self,
        placements: &[Placement],
        bids: &[Bid],
        eligibility: &dyn Eligibility,
    ) -> Assignment {
        let matrix = ValueMatrix::for_value(placements, bids, eligibility);
        let costs = matrix.maximizing_costs();
        tracing::debug!(?costs, "cost matrix for value maximization");

        let matching = lap::solve(&costs);
        matching
            .pairs()
            .filter_map(|(row, column)| matrix.pair(row, column))
            .map(|(placement, bid)| (placement.clone(), bid.clone()))
            .collect()
    }

    /// Redistributes the winners on prioritized placements so that stronger
    /// bids land on higher priority placements. Placements the priority
    /// function leaves out keep their winner. Falls back to `by_value` if the
    /// redistribution loses more than the configured tolerance.
    fn prioritize(
        &self,
        placements: &[Placement],
        by_value: Assignment,
        eligibility: &dyn Eligibility,
        priority: &dyn Priority,
    ) -> Assignment {
        let by_priority: Vec<Placement> = priority
            .prioritize(placements)
            .into_iter()
            .filter(|placement| placements.contains(placement))
            .unique()
            .collect();
        tracing::debug!(?by_priority, "placements by priority");
        let covered: HashSet<&Placement> = by_priority.iter().collect();

        let ascending: Vec<&Bid> = by_value
            .iter()
            .filter(|(placement, _)| covered.contains(placement))
            .map(|(_, bid)| bid)
            .sorted_by(|a, b| a.cpm.total_cmp(&b.cpm))
            .collect();

        let matrix = ValueMatrix::for_priority(&by_priority, ascending.iter().copied(), eligibility);
        let costs = matrix.minimizing_costs();
        tracing::debug!(?costs, "cost matrix for priority");

        let matching = lap::solve(&costs);
        let mut merged: Assignment = matching
            .pairs()
            .filter_map(|(row, column)| matrix.pair(row, column))
            .map(|(placement, bid)| (placement.clone(), bid.clone()))
            .collect();
        for (placement, bid) in by_value.iter() {
            if !covered.contains(&placement) {
                merged.insert(placement.clone(), bid.clone());
            }
        }
        let merged = merged.ordered_by(placements);

        let difference = Difference::between(&merged, &by_value);
        tracing::debug!(?difference, "priority versus value maximizing assignment");
        if difference.gain_amount + self.config.priority_tolerance < 0.0 {
            tracing::debug!("priority assignment loses value, keeping value maximizing assignment");
            return by_value;
        }
        merged
    }

    fn reconcile(
        &self,
        placements: &[Placement],
        original: &Assignment,
        by_value: Assignment,
        eligibility: &dyn Eligibility,
    ) -> Assignment {
        match self.config.reconciliation {
            Reconciliation::None => by_value,
            Reconciliation::Swap => reconcile::swap(placements, &by_value, eligibility),
            Reconciliation::Positional => {
                match reconcile::positional(placements, original, &by_value, eligibility) {
                    Some(reconciled) => reconciled,
                    None => {
                        tracing::warn!(
                            "could not keep every winner while restoring original placements, \
                             using value maximizing assignment"
                        );
                        by_value
                    }
                }
            }
        }
    }
}

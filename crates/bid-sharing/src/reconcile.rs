//! Moving bids back towards the placements they were submitted for.
//!
//! Value maximization only cares about which bids win, not where they end
//! up. Without a priority function these passes shuffle the winners so that
//! as few placements as possible change identity. They never change which
//! bids win, only where.

use {
    crate::{
        domain::{AdId, Assignment, Bid, Placement},
        strategy::Eligibility,
    },
    std::collections::HashSet,
};

/// Keeps every bid that was submitted for a placement with an original
/// winner on that placement (the original winner itself if it still wins).
/// The remaining winners first go to open placements that had an original
/// winner, their own placement if it is one of those, else the first one
/// they are eligible for. Only after that do they fall back to any open
/// placement, so a bid whose own placement had no original winner still
/// lands on an original slot when one is free. Only eligible pairs are ever
/// formed.
///
/// Returns `None` if some winner can't be placed.
pub fn positional(
    placements: &[Placement],
    original: &Assignment,
    optimized: &Assignment,
    eligibility: &dyn Eligibility,
) -> Option<Assignment> {
    let mut reassigned = Assignment::new();
    let mut used: HashSet<&AdId> = HashSet::new();

    let original_placements: Vec<&Placement> = original
        .placements()
        .filter(|placement| placements.contains(placement))
        .collect();

    for &placement in &original_placements {
        let candidate = |bid: &&Bid| {
            &bid.ad_unit_code == placement
                && !used.contains(&bid.ad_id)
                && eligibility.is_eligible(placement, bid)
        };
        let stays = original
            .get(placement)
            .and_then(|winner| {
                optimized
                    .bids()
                    .filter(candidate)
                    .find(|bid| bid.ad_id == winner.ad_id)
            })
            .or_else(|| optimized.bids().find(candidate));
        if let Some(bid) = stays {
            used.insert(&bid.ad_id);
            reassigned.insert(placement.clone(), bid.clone());
        }
    }

    let mut available: Vec<&Placement> = original_placements
        .into_iter()
        .filter(|placement| !reassigned.contains(placement))
        .collect();

    for bid in optimized.bids().filter(|bid| !used.contains(&bid.ad_id)) {
        let own = available
            .iter()
            .position(|&placement| placement == &bid.ad_unit_code)
            .filter(|_| eligibility.is_eligible(&bid.ad_unit_code, bid));
        let original_slot = || {
            available
                .iter()
                .position(|placement| eligibility.is_eligible(placement, bid))
        };

        let target = match own.or_else(original_slot) {
            Some(index) => available.remove(index).clone(),
            None => {
                let Some(open) = placements.iter().find(|placement| {
                    !reassigned.contains(placement) && eligibility.is_eligible(placement, bid)
                }) else {
                    tracing::debug!(ad_id = %bid.ad_id, "no open placement left for bid");
                    return None;
                };
                open.clone()
            }
        };
        reassigned.insert(target, bid.clone());
    }

    Some(reassigned.ordered_by(placements))
}

/// Walks the placements in order and, whenever a placement holds a bid
/// borrowed from elsewhere while its own bid sits on another placement,
/// swaps the two if both remain eligible.
pub fn swap(
    placements: &[Placement],
    optimized: &Assignment,
    eligibility: &dyn Eligibility,
) -> Assignment {
    let mut assignment = optimized.ordered_by(placements);

    for placement in placements {
        let Some(here) = assignment.get(placement) else {
            continue;
        };
        if &here.ad_unit_code == placement {
            continue;
        }
        let holder = placements.iter().find(|other| {
            *other != placement
                && assignment
                    .get(other)
                    .is_some_and(|bid| &bid.ad_unit_code == placement)
        });
        let Some(holder) = holder else {
            continue;
        };

        let (here, there) = (here.clone(), assignment.get(holder).cloned());
        let Some(there) = there else {
            continue;
        };
        if eligibility.is_eligible(placement, &there) && eligibility.is_eligible(holder, &here) {
            assignment.insert(placement.clone(), there);
            assignment.insert(holder.clone(), here);
        }
    }

    assignment
}

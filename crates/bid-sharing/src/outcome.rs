//! What an optimization call reports back besides the winning bids.

use {
    crate::domain::{Assignment, Bid, Placement},
    serde::Serialize,
};

/// The final bids of one optimization call and how they came about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// Either the committed optimized assignment or the untouched baseline.
    pub winning_bids: Vec<Bid>,
    pub decision: Decision,
    /// Optimized versus baseline value. Missing when optimization was
    /// skipped.
    pub difference: Option<Difference>,
    pub changes: Vec<ChangeSummary>,
}

impl Outcome {
    pub(crate) fn skipped(baseline: &[Bid], reason: SkipReason) -> Self {
        Self {
            winning_bids: baseline.to_vec(),
            decision: Decision::Skipped(reason),
            difference: None,
            changes: Vec::new(),
        }
    }

    pub fn total_value(&self) -> f64 {
        self.winning_bids.iter().map(|bid| bid.cpm).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "status", content = "reason")]
pub enum Decision {
    /// The optimized assignment replaced the baseline.
    Accepted,
    /// The optimized assignment wasn't good enough, the baseline was kept.
    Rejected,
    /// Nothing was optimized, the baseline was kept.
    Skipped(SkipReason),
}

impl Decision {
    pub fn is_accepted(self) -> bool {
        matches!(self, Decision::Accepted)
    }

    pub fn is_skipped(self) -> bool {
        matches!(self, Decision::Skipped(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    NoEligibilityPredicate,
    NoPlacements,
    NoBids,
}

/// Value of one assignment compared to another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Difference {
    pub original_total: f64,
    pub reassigned_total: f64,
    /// `reassigned_total - original_total`, rounded to 4 decimals.
    pub gain_amount: f64,
    /// `gain_amount / original_total`, undefined for a zero baseline.
    pub gain_ratio: Option<f64>,
}

impl Difference {
    pub fn between(reassigned: &Assignment, original: &Assignment) -> Self {
        let original_total = original.total_value();
        let reassigned_total = reassigned.total_value();
        let gain_amount = ((reassigned_total - original_total) * 10_000.0).round() / 10_000.0;
        let gain_ratio = (original_total != 0.0).then(|| gain_amount / original_total);
        Self {
            original_total,
            reassigned_total,
            gain_amount,
            gain_ratio,
        }
    }
}

/// How the winner of one placement changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub placement: Placement,
    pub status: ChangeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum ChangeStatus {
    /// The placement is filled by a bid that was submitted for it.
    Unchanged,
    /// The placement is filled by a bid borrowed from another placement.
    #[serde(rename_all = "camelCase")]
    Changed {
        source_placement: Placement,
        prior_cpm: f64,
        final_cpm: f64,
        gain: f64,
    },
    /// No bid fills the placement.
    Empty,
}

/// Summarizes, for every placement, how `reassigned` differs from
/// `original`.
pub fn change_summaries(
    placements: &[Placement],
    reassigned: &Assignment,
    original: &Assignment,
) -> Vec<ChangeSummary> {
    placements
        .iter()
        .map(|placement| {
            let status = match reassigned.get(placement) {
                None => ChangeStatus::Empty,
                Some(bid) if &bid.ad_unit_code == placement => ChangeStatus::Unchanged,
                Some(bid) => {
                    let prior_cpm = original.get(placement).map_or(0.0, |prior| prior.cpm);
                    ChangeStatus::Changed {
                        source_placement: bid.ad_unit_code.clone(),
                        prior_cpm,
                        final_cpm: bid.cpm,
                        gain: bid.cpm - prior_cpm,
                    }
                }
            };
            ChangeSummary {
                placement: placement.clone(),
                status,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn assignment(entries: &[(&str, Bid)]) -> Assignment {
        entries
            .iter()
            .map(|(placement, bid)| (Placement::from(*placement), bid.clone()))
            .collect()
    }

    #[test]
    fn difference_rounds_gain_and_handles_zero_baseline() {
        let original = assignment(&[("A", Bid::new("1", "A", 0.1)), ("B", Bid::new("2", "B", 0.2))]);
        let reassigned = assignment(&[("A", Bid::new("3", "A", 0.35))]);

        let difference = Difference::between(&reassigned, &original);
        assert_eq!(difference.gain_amount, 0.05);
        assert!((difference.gain_ratio.unwrap() - 0.05 / 0.3).abs() < 1e-12);

        let difference = Difference::between(&reassigned, &Assignment::new());
        assert_eq!(difference.gain_amount, 0.35);
        assert_eq!(difference.gain_ratio, None);
    }

    #[test]
    fn summaries_cover_every_placement() {
        let placements: Vec<Placement> = vec!["A".into(), "B".into(), "C".into()];
        let original = assignment(&[("A", Bid::new("1", "A", 1.0)), ("B", Bid::new("2", "B", 2.0))]);
        let reassigned = assignment(&[("A", Bid::new("1", "A", 1.0)), ("B", Bid::new("3", "C", 5.0))]);

        let summaries = change_summaries(&placements, &reassigned, &original);

        assert_eq!(
            serde_json::to_value(summaries).unwrap(),
            json!([
                { "placement": "A", "status": { "kind": "unchanged" } },
                {
                    "placement": "B",
                    "status": {
                        "kind": "changed",
                        "sourcePlacement": "C",
                        "priorCpm": 2.0,
                        "finalCpm": 5.0,
                        "gain": 3.0
                    }
                },
                { "placement": "C", "status": { "kind": "empty" } }
            ])
        );
    }
}

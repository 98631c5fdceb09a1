//! Strategies supplied by the caller: which bids may fill which placement,
//! and in which order placements should receive the strongest bids.

use {
    crate::domain::{Bid, Placement},
    itertools::Itertools,
    regex::Regex,
    std::sync::LazyLock,
};

/// Decides whether a bid may fill a placement. Must be pure for the duration
/// of one optimization call.
pub trait Eligibility {
    fn is_eligible(&self, placement: &Placement, bid: &Bid) -> bool;
}

impl<F> Eligibility for F
where
    F: Fn(&Placement, &Bid) -> bool,
{
    fn is_eligible(&self, placement: &Placement, bid: &Bid) -> bool {
        self(placement, bid)
    }
}

/// Ranks placements. Returns an ordered subsequence of the given placements,
/// highest priority first. Placements left out are not re-prioritized.
pub trait Priority {
    fn prioritize(&self, placements: &[Placement]) -> Vec<Placement>;
}

impl<F> Priority for F
where
    F: Fn(&[Placement]) -> Vec<Placement>,
{
    fn prioritize(&self, placements: &[Placement]) -> Vec<Placement> {
        self(placements)
    }
}

/// The strategies for one optimization call. Without an eligibility
/// predicate the optimizer returns the baseline untouched; without a priority
/// function the priority phase is skipped.
#[derive(Clone, Copy, Default)]
pub struct Strategies<'a> {
    pub eligibility: Option<&'a dyn Eligibility>,
    pub priority: Option<&'a dyn Priority>,
}

impl<'a> Strategies<'a> {
    pub fn new(eligibility: &'a dyn Eligibility) -> Self {
        Self {
            eligibility: Some(eligibility),
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: &'a dyn Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

impl std::fmt::Debug for Strategies<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategies")
            .field("eligibility", &self.eligibility.is_some())
            .field("priority", &self.priority.is_some())
            .finish()
    }
}

/// A bid may only fill the placement it was submitted for.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactPlacement;

impl Eligibility for ExactPlacement {
    fn is_eligible(&self, placement: &Placement, bid: &Bid) -> bool {
        &bid.ad_unit_code == placement
    }
}

static DEPTH_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-depth-(\d+)$").expect("valid regex"));

/// Splits `<base>-depth-<N>` into its base code and depth.
pub fn depth_of(placement: &Placement) -> Option<(&str, u64)> {
    let captures = DEPTH_SUFFIX.captures(placement.as_str())?;
    let suffix = captures.get(0)?;
    let depth = captures.get(1)?.as_str().parse().ok()?;
    Some((&placement.as_str()[..suffix.start()], depth))
}

/// Placements repeating at increasing depth (`<base>-depth-<N>`) share their
/// bids: a bid submitted for any depth of a base code may fill any other
/// depth of the same base code. Bidders that insist on their individual
/// placements are excluded from the pool.
#[derive(Debug, Clone)]
pub struct SharedDepthPool {
    individual_bidders: Vec<String>,
}

impl SharedDepthPool {
    pub const DEFAULT_INDIVIDUAL_BIDDERS: [&'static str; 2] = ["ix", "sovrn"];

    pub fn new(individual_bidders: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            individual_bidders: individual_bidders
                .into_iter()
                .map(|bidder| bidder.into().to_lowercase())
                .collect(),
        }
    }

    fn is_shareable(&self, bid: &Bid) -> bool {
        !self
            .individual_bidders
            .contains(&bid.bidder.to_lowercase())
    }
}

impl Default for SharedDepthPool {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INDIVIDUAL_BIDDERS)
    }
}

impl Eligibility for SharedDepthPool {
    fn is_eligible(&self, placement: &Placement, bid: &Bid) -> bool {
        if &bid.ad_unit_code == placement {
            return true;
        }
        if !self.is_shareable(bid) {
            return false;
        }
        match (depth_of(placement), depth_of(&bid.ad_unit_code)) {
            (Some((base, _)), Some((bid_base, _))) => base == bid_base,
            _ => false,
        }
    }
}

/// Ranks `<base>-depth-<N>` placements by ascending depth. Placements without
/// a depth suffix are not covered.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthPriority;

impl Priority for DepthPriority {
    fn prioritize(&self, placements: &[Placement]) -> Vec<Placement> {
        placements
            .iter()
            .filter_map(|placement| Some((depth_of(placement)?.1, placement)))
            .sorted_by_key(|(depth, _)| *depth)
            .map(|(_, placement)| placement.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, maplit::hashmap, rstest::rstest};

    #[rstest]
    #[case("feed-depth-3", Some(("feed", 3)))]
    #[case("feed-depth-12", Some(("feed", 12)))]
    #[case("sidebar", None)]
    #[case("feed-depth-", None)]
    #[case("feed-depth-2-sticky", None)]
    fn parses_depth_suffix(#[case] code: &str, #[case] expected: Option<(&str, u64)>) {
        assert_eq!(depth_of(&Placement::from(code)), expected);
    }

    #[test]
    fn shared_pool_respects_base_code_and_individual_bidders() {
        let pool = SharedDepthPool::default();
        let shared = Bid::new("1", "feed-depth-1", 1.0).with_bidder("appnexus");
        let individual = Bid::new("2", "feed-depth-1", 1.0).with_bidder("IX");

        assert!(pool.is_eligible(&"feed-depth-4".into(), &shared));
        assert!(!pool.is_eligible(&"other-depth-4".into(), &shared));
        assert!(!pool.is_eligible(&"feed-depth-4".into(), &individual));
        assert!(pool.is_eligible(&"feed-depth-1".into(), &individual));

        let fixed = Bid::new("3", "sidebar", 1.0);
        assert!(pool.is_eligible(&"sidebar".into(), &fixed));
        assert!(!pool.is_eligible(&"feed-depth-1".into(), &fixed));
    }

    #[test]
    fn individual_bidders_are_case_insensitive() {
        let pool = SharedDepthPool::new(["Sovrn"]);
        let bids = [
            Bid::new("1", "top-depth-2", 1.0).with_bidder("rubicon"),
            Bid::new("2", "top-depth-2", 1.0).with_bidder("SOVRN"),
        ];
        let expected = hashmap! {
            ("top-depth-1", "1") => true,
            ("top-depth-1", "2") => false,
            ("top-depth-2", "2") => true,
            ("top", "1") => false,
        };

        for ((placement, ad_id), eligible) in expected {
            let bid = bids.iter().find(|bid| bid.ad_id.as_str() == ad_id).unwrap();
            assert_eq!(
                pool.is_eligible(&placement.into(), bid),
                eligible,
                "{placement} {ad_id}"
            );
        }
    }

    #[test]
    fn depth_priority_orders_by_depth_and_skips_plain_codes() {
        let placements: Vec<Placement> = ["feed-depth-3", "sidebar", "feed-depth-1", "feed-depth-2"]
            .into_iter()
            .map(Placement::from)
            .collect();
        assert_eq!(
            DepthPriority.prioritize(&placements),
            vec![
                Placement::from("feed-depth-1"),
                Placement::from("feed-depth-2"),
                Placement::from("feed-depth-3"),
            ]
        );
    }

    #[test]
    fn closures_are_strategies() {
        let anything = |_: &Placement, _: &Bid| true;
        let reversed =
            |placements: &[Placement]| -> Vec<Placement> { placements.iter().rev().cloned().collect() };
        let strategies = Strategies::new(&anything).with_priority(&reversed);

        let bid = Bid::new("1", "A", 1.0);
        assert!(strategies.eligibility.unwrap().is_eligible(&"B".into(), &bid));
        assert_eq!(
            strategies.priority.unwrap().prioritize(&["A".into(), "B".into()]),
            vec![Placement::from("B"), Placement::from("A")]
        );
    }
}

//! Bids, placements and assignments.
//!
//! These types mirror what the host auction hands over for one optimization
//! call. Everything the optimizer doesn't look at is carried along in
//! [`Bid::payload`] and written back out untouched.

use {
    derive_more::{Display, From, Into},
    indexmap::IndexMap,
    serde::{Deserialize, Serialize},
};

/// Bid values are scaled by this factor and truncated before they enter a
/// matrix so the solver only ever compares integers.
pub const SCALE: f64 = 1_000_000.0;

/// Identifier of a slot to be filled (the ad unit code).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    From,
    Into,
    Display,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Placement(pub String);

impl Placement {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Placement {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Unique identifier of a bid.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    From,
    Into,
    Display,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct AdId(pub String);

impl AdId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AdId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A value-bearing bid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub ad_id: AdId,
    /// The placement this bid currently belongs to. On acceptance the
    /// optimizer hands out copies carrying the placement they were assigned
    /// to.
    pub ad_unit_code: Placement,
    pub cpm: f64,
    #[serde(default)]
    pub bidder: String,
    /// Opaque fields passed through unchanged.
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl Bid {
    pub fn new(ad_id: impl Into<AdId>, ad_unit_code: impl Into<Placement>, cpm: f64) -> Self {
        Self {
            ad_id: ad_id.into(),
            ad_unit_code: ad_unit_code.into(),
            cpm,
            bidder: String::new(),
            payload: Default::default(),
        }
    }

    pub fn with_bidder(mut self, bidder: impl Into<String>) -> Self {
        self.bidder = bidder.into();
        self
    }

    /// The bid value in the integer domain used by the matrices.
    ///
    /// Negative and NaN values clamp to zero.
    pub fn scaled_value(&self) -> i64 {
        // float -> int casts saturate, NaN becomes 0
        ((self.cpm * SCALE) as i64).max(0)
    }
}

/// All inputs of one optimization call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    /// The pre-optimization baseline, at most one bid per placement.
    pub original_winning_bids: Vec<Bid>,
    #[serde(rename = "adUnitCodes")]
    pub placements: Vec<Placement>,
    /// The full candidate pool.
    pub bids_received: Vec<Bid>,
}

impl Auction {
    /// The baseline as a placement -> bid mapping. A later bid for the same
    /// placement replaces an earlier one.
    pub fn original_assignment(&self) -> Assignment {
        self.original_winning_bids
            .iter()
            .map(|bid| (bid.ad_unit_code.clone(), bid.clone()))
            .collect()
    }
}

/// Partial mapping from placement to the bid filling it.
///
/// Iteration follows insertion order, which the optimizer keeps aligned with
/// the placement sequence of the auction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment(IndexMap<Placement, Bid>);

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, placement: Placement, bid: Bid) -> Option<Bid> {
        self.0.insert(placement, bid)
    }

    pub fn get(&self, placement: &Placement) -> Option<&Bid> {
        self.0.get(placement)
    }

    pub fn contains(&self, placement: &Placement) -> bool {
        self.0.contains_key(placement)
    }

    pub fn contains_bid(&self, ad_id: &AdId) -> bool {
        self.0.values().any(|bid| &bid.ad_id == ad_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Placement, &Bid)> {
        self.0.iter()
    }

    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.0.keys()
    }

    pub fn bids(&self) -> impl Iterator<Item = &Bid> {
        self.0.values()
    }

    /// Sum of the values of all assigned bids.
    pub fn total_value(&self) -> f64 {
        self.0.values().map(|bid| bid.cpm).sum()
    }

    /// Returns a copy ordered by the given placement sequence. Placements not
    /// in the sequence keep their relative order at the end.
    pub fn ordered_by(&self, placements: &[Placement]) -> Self {
        let mut ordered: IndexMap<_, _> = placements
            .iter()
            .filter_map(|placement| Some((placement.clone(), self.0.get(placement)?.clone())))
            .collect();
        for (placement, bid) in &self.0 {
            ordered
                .entry(placement.clone())
                .or_insert_with(|| bid.clone());
        }
        Self(ordered)
    }

    /// Commits the assignment: every bid is returned with its placement
    /// field set to the placement it was assigned to.
    pub fn into_winning_bids(self) -> Vec<Bid> {
        self.0
            .into_iter()
            .map(|(placement, mut bid)| {
                bid.ad_unit_code = placement;
                bid
            })
            .collect()
    }
}

impl FromIterator<(Placement, Bid)> for Assignment {
    fn from_iter<T: IntoIterator<Item = (Placement, Bid)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Assignment {
    type IntoIter = indexmap::map::IntoIter<Placement, Bid>;
    type Item = (Placement, Bid);

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn bid_payload_round_trips_unknown_fields() {
        let raw = json!({
            "adId": "a1",
            "adUnitCode": "top-depth-1",
            "cpm": 1.25,
            "bidder": "appnexus",
            "width": 300,
            "adserverTargeting": { "hb_pb": "1.20" }
        });
        let bid: Bid = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(bid.ad_id, AdId::from("a1"));
        assert_eq!(bid.payload["width"], json!(300));
        assert_eq!(serde_json::to_value(&bid).unwrap(), raw);
    }

    #[test]
    fn scaled_value_truncates_and_clamps() {
        assert_eq!(Bid::new("a", "A", 1.2345678).scaled_value(), 1_234_567);
        assert_eq!(Bid::new("a", "A", -3.0).scaled_value(), 0);
        assert_eq!(Bid::new("a", "A", f64::NAN).scaled_value(), 0);
    }

    #[test]
    fn committing_stamps_assigned_placement() {
        let assignment: Assignment = [
            (Placement::from("B"), Bid::new("1", "A", 2.0)),
            (Placement::from("A"), Bid::new("2", "B", 8.0)),
        ]
        .into_iter()
        .collect();

        let bids = assignment.into_winning_bids();
        assert_eq!(bids[0].ad_id, AdId::from("1"));
        assert_eq!(bids[0].ad_unit_code, Placement::from("B"));
        assert_eq!(bids[1].ad_unit_code, Placement::from("A"));
    }

    #[test]
    fn ordered_by_follows_placement_sequence() {
        let assignment: Assignment = [
            (Placement::from("C"), Bid::new("3", "C", 1.0)),
            (Placement::from("A"), Bid::new("1", "A", 1.0)),
        ]
        .into_iter()
        .collect();
        let ordered = assignment.ordered_by(&["A".into(), "B".into(), "C".into()]);
        assert_eq!(
            ordered.placements().cloned().collect::<Vec<_>>(),
            vec![Placement::from("A"), Placement::from("C")]
        );
    }
}

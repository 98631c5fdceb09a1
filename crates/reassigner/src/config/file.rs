use {
    super::{EligibilityRule, PriorityRule},
    anyhow::{Context, Result},
    bid_sharing::{AcceptancePolicy, DepthPriority, ExactPlacement, SharedDepthPool},
    serde::Deserialize,
    std::path::Path,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Config {
    /// When an optimized assignment replaces the original winning bids.
    #[serde(default)]
    acceptance: Acceptance,

    /// How winners are moved back towards their own placements when no
    /// priority rule is configured.
    #[serde(default)]
    reconciliation: Reconciliation,

    /// How much value the priority phase may lose before it is discarded.
    #[serde(default = "default_priority_tolerance")]
    priority_tolerance: f64,

    /// Which bids may fill which placements. Without a rule auctions are
    /// passed through untouched.
    #[serde(default)]
    eligibility: Eligibility,

    /// Which placements should receive the strongest bids.
    #[serde(default)]
    priority: Priority,

    #[serde(default)]
    cache: Cache,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "policy")]
enum Acceptance {
    #[default]
    NonNegative,
    #[serde(rename_all = "kebab-case")]
    Threshold {
        #[serde(default = "default_min_gain")]
        min_gain: f64,
        #[serde(default = "default_min_gain_ratio")]
        min_gain_ratio: f64,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum Reconciliation {
    #[default]
    Positional,
    Swap,
    None,
}

// Empty struct variants: unit variants of internally tagged enums ignore
// unknown fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "rule", deny_unknown_fields)]
enum Eligibility {
    Exact {},
    #[serde(rename_all = "kebab-case")]
    SharedDepthPool {
        #[serde(default = "default_individual_bidders")]
        individual_bidders: Vec<String>,
    },
    None {},
}

impl Default for Eligibility {
    fn default() -> Self {
        Self::None {}
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "rule", deny_unknown_fields)]
enum Priority {
    DepthSuffix {},
    None {},
}

impl Default for Priority {
    fn default() -> Self {
        Self::None {}
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Cache {
    capacity: Option<usize>,
}

fn default_priority_tolerance() -> f64 {
    bid_sharing::Config::DEFAULT_PRIORITY_TOLERANCE
}

fn default_min_gain() -> f64 {
    AcceptancePolicy::DEFAULT_MIN_GAIN
}

fn default_min_gain_ratio() -> f64 {
    AcceptancePolicy::DEFAULT_MIN_GAIN_RATIO
}

fn default_individual_bidders() -> Vec<String> {
    SharedDepthPool::DEFAULT_INDIVIDUAL_BIDDERS
        .map(String::from)
        .to_vec()
}

/// Load the configuration from a TOML file.
pub fn load(path: &Path) -> Result<super::Config> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("I/O error while reading {path:?}"))?;
    load_str(&data).with_context(|| format!("invalid configuration in {path:?}"))
}

/// Load the configuration from a TOML string.
pub fn load_str(data: &str) -> Result<super::Config> {
    let config = toml::de::from_str::<Config>(data).context("TOML syntax error")?;

    let acceptance = match config.acceptance {
        Acceptance::NonNegative => AcceptancePolicy::NonNegative,
        Acceptance::Threshold {
            min_gain,
            min_gain_ratio,
        } => AcceptancePolicy::Threshold {
            min_gain,
            min_gain_ratio,
        },
    };
    let reconciliation = match config.reconciliation {
        Reconciliation::Positional => bid_sharing::Reconciliation::Positional,
        Reconciliation::Swap => bid_sharing::Reconciliation::Swap,
        Reconciliation::None => bid_sharing::Reconciliation::None,
    };
    let optimizer = bid_sharing::Config {
        acceptance,
        reconciliation,
        priority_tolerance: config.priority_tolerance,
    }
    .validate()?;

    let eligibility = match config.eligibility {
        Eligibility::Exact {} => Some(EligibilityRule::Exact(ExactPlacement)),
        Eligibility::SharedDepthPool { individual_bidders } => Some(
            EligibilityRule::SharedDepthPool(SharedDepthPool::new(individual_bidders)),
        ),
        Eligibility::None {} => None,
    };
    let priority = match config.priority {
        Priority::DepthSuffix {} => Some(PriorityRule::DepthSuffix(DepthPriority)),
        Priority::None {} => None,
    };
    if matches!(config.cache.capacity, Some(0)) {
        anyhow::bail!("cache capacity must be positive");
    }

    Ok(super::Config {
        optimizer,
        eligibility,
        priority,
        cache_capacity: config.cache.capacity,
    })
}

#[cfg(test)]
mod tests {
    use {super::*, bid_sharing::Eligibility as _, std::io::Write};

    #[test]
    fn empty_file_uses_defaults() {
        let config = load_str("").unwrap();

        assert_eq!(config.optimizer, bid_sharing::Config::default());
        assert!(config.eligibility.is_none());
        assert!(config.priority.is_none());
        assert_eq!(config.cache_capacity, None);
        assert!(config.strategies().eligibility.is_none());
    }

    #[test]
    fn full_file() {
        let config = load_str(
            r#"
            reconciliation = "swap"
            priority-tolerance = 0.01

            [acceptance]
            policy = "threshold"
            min-gain = 0.1

            [eligibility]
            rule = "shared-depth-pool"
            individual-bidders = ["ix"]

            [priority]
            rule = "depth-suffix"

            [cache]
            capacity = 64
            "#,
        )
        .unwrap();

        assert_eq!(
            config.optimizer,
            bid_sharing::Config {
                acceptance: AcceptancePolicy::Threshold {
                    min_gain: 0.1,
                    min_gain_ratio: AcceptancePolicy::DEFAULT_MIN_GAIN_RATIO,
                },
                reconciliation: bid_sharing::Reconciliation::Swap,
                priority_tolerance: 0.01,
            }
        );
        assert!(matches!(
            config.eligibility,
            Some(EligibilityRule::SharedDepthPool(_))
        ));
        assert!(matches!(
            config.priority,
            Some(PriorityRule::DepthSuffix(_))
        ));
        assert_eq!(config.cache_capacity, Some(64));

        let strategies = config.strategies();
        let sovrn = bid_sharing::Bid::new("1", "feed-depth-1", 1.0).with_bidder("sovrn");
        // only ix is individual now
        assert!(
            strategies
                .eligibility
                .unwrap()
                .is_eligible(&"feed-depth-2".into(), &sovrn)
        );
    }

    #[test]
    fn rejects_unknown_keys_and_invalid_values() {
        assert!(load_str("reconcilation = \"swap\"").is_err());
        assert!(load_str("priority-tolerance = -1.0").is_err());
        assert!(load_str("[cache]\ncapacity = 0").is_err());
        assert!(load_str("[eligibility]\nrule = \"everything\"").is_err());
        assert!(load_str("[eligibility]\nrule = \"exact\"\nindividual-bidders = [\"ix\"]").is_err());
        assert!(load_str("[priority]\nrule = \"depth-suffix\"\nmax-depth = 3").is_err());
    }

    #[test]
    fn load_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "reconciliation = \"sideways\"").unwrap();

        let err = load(file.path()).unwrap_err();

        assert!(format!("{err:#}").contains(&format!("{:?}", file.path())));
    }
}

use bid_sharing::{DepthPriority, Eligibility, ExactPlacement, Priority, SharedDepthPool, Strategies};

pub mod file;

#[derive(Debug, Clone)]
pub struct Config {
    pub optimizer: bid_sharing::Config,
    pub eligibility: Option<EligibilityRule>,
    pub priority: Option<PriorityRule>,
    /// Maximum number of cached results. Unbounded when missing.
    pub cache_capacity: Option<usize>,
}

/// Built-in eligibility predicates selectable from the config file.
#[derive(Debug, Clone)]
pub enum EligibilityRule {
    Exact(ExactPlacement),
    SharedDepthPool(SharedDepthPool),
}

/// Built-in priority functions selectable from the config file.
#[derive(Debug, Clone, Copy)]
pub enum PriorityRule {
    DepthSuffix(DepthPriority),
}

impl EligibilityRule {
    pub fn as_dyn(&self) -> &dyn Eligibility {
        match self {
            EligibilityRule::Exact(exact) => exact,
            EligibilityRule::SharedDepthPool(pool) => pool,
        }
    }
}

impl PriorityRule {
    pub fn as_dyn(&self) -> &dyn Priority {
        match self {
            PriorityRule::DepthSuffix(depth) => depth,
        }
    }
}

impl Config {
    /// The configured strategies, borrowed for one optimization call.
    pub fn strategies(&self) -> Strategies<'_> {
        Strategies {
            eligibility: self.eligibility.as_ref().map(EligibilityRule::as_dyn),
            priority: self.priority.as_ref().map(PriorityRule::as_dyn),
        }
    }
}

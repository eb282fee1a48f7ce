use std::env;
use std::time::Duration;

/// Retry policy of the node resolver for transient store failures
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverOptions {
    /// Total attempts per store round-trip, first one included (default: 5)
    pub max_attempts: u32,

    /// Delay before the first retry (default: 50ms)
    pub initial_backoff: Duration,

    /// Upper bound of the exponential backoff (default: 2s)
    pub max_backoff: Duration,

    /// Random delay added to each backoff, up to this value (default: 25ms)
    pub jitter: Duration,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
            jitter: Duration::from_millis(25),
        }
    }
}

impl ResolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Retry immediately, useful in tests
    pub fn without_backoff(self) -> Self {
        self.initial_backoff(Duration::ZERO)
            .max_backoff(Duration::ZERO)
            .jitter(Duration::ZERO)
    }

    /// Backoff before retry number `retry` (1-based), jitter excluded
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

/// Bounds of the pattern-collapsing pass
#[derive(Debug, Clone, PartialEq)]
pub struct CollapseOptions {
    /// Longest path (in edges) the traversal expands; unbounded when `None`
    pub max_depth: Option<usize>,

    /// Collapse passes run by `collapse_until_stable` before giving up (default: 16)
    pub max_passes: usize,
}

impl Default for CollapseOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_passes: 16,
        }
    }
}

impl CollapseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes;
        self
    }
}

/// Options of a whole navigation model
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineOptions {
    pub resolver: ResolverOptions,
    pub collapse: CollapseOptions,
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl EngineOptions {
    /// Defaults overridden by `NAV_GRAPH_*` environment variables.
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Some(attempts) = env_parse::<u32>("NAV_GRAPH_RETRY_ATTEMPTS") {
            options.resolver = options.resolver.max_attempts(attempts);
        }
        if let Some(ms) = env_parse::<u64>("NAV_GRAPH_RETRY_INITIAL_MS") {
            options.resolver.initial_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("NAV_GRAPH_RETRY_MAX_MS") {
            options.resolver.max_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("NAV_GRAPH_RETRY_JITTER_MS") {
            options.resolver.jitter = Duration::from_millis(ms);
        }
        if let Some(depth) = env_parse::<usize>("NAV_GRAPH_COLLAPSE_MAX_DEPTH") {
            options.collapse.max_depth = Some(depth);
        }
        if let Some(passes) = env_parse::<usize>("NAV_GRAPH_COLLAPSE_MAX_PASSES") {
            options.collapse.max_passes = passes;
        }

        options
    }
}

use std::time::Duration;

/// Broker configuration. No file or environment parsing lives in this
/// crate; an embedding application is expected to fold this struct into its
/// own configuration layer if it has one, which is why `serde` support is
/// available even though nothing here reads a config file directly.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrokerConfig {
    /// Cadence of the reclaimer's sweep. Defaults to one second.
    pub reclaim_interval: Duration,

    /// Whether the reclaimer yields the scheduler between entries while
    /// sweeping a large directory, so a single tick never monopolizes a
    /// core.
    pub reclaim_batch_yield: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            reclaim_interval: Duration::from_secs(1),
            reclaim_batch_yield: true,
        }
    }
}

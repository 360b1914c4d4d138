use thiserror::Error;

use crate::layout::Ring;

/// Problems with a user-supplied gauge configuration. Configuration is rejected
/// as a whole; nothing is built from a config that fails here.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("You need to define at least one entity for {0} gauge")]
    MissingSegments(Ring),

    #[error("Segment #{index} of the {ring} gauge has no entity")]
    MissingSourceId { ring: Ring, index: usize },

    #[error("Gauge range is empty: min ({min}) equals max ({max})")]
    DegenerateRange { min: f64, max: f64 },

    #[error("Malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One or more configured sources are missing from a snapshot.
///
/// Not fatal: the gauge switches to its diagnostic view and recovers on the
/// next snapshot that carries every source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Error finding these entities: {}", .sources.join(", "))]
pub struct UnresolvedSourceError {
    pub sources: Vec<String>,
}

#[derive(Error, Debug)]
pub enum GaugeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Gauge received data before it was configured")]
    NotConfigured,
}

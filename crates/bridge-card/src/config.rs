use crate::remote::DEFAULT_FETCH_LIMIT;
use crate::scanner::ExtractMode;

/// Tunables for a [`crate::BridgeCard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Maximum number of bytes requested from a remote resource per `READ_REMOTE`.
    pub fetch_limit: usize,
    pub extract_mode: ExtractMode,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            fetch_limit: DEFAULT_FETCH_LIMIT,
            extract_mode: ExtractMode::default(),
        }
    }
}

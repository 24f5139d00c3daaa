//! Engine-wide tunables. The only configuration surface this crate has —
//! there is no network or server configuration here.

/// Tunables accepted by [`crate::archive::Archive::open`] and the catalog.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of decoded clusters held in the LRU cache.
    pub cluster_cache_entries: usize,
    /// Soft byte budget for the decoded-cluster cache.
    pub cluster_cache_bytes: u64,
    /// Maximum redirect hops followed before failing.
    pub max_redirect_hops: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            cluster_cache_entries: 8,
            cluster_cache_bytes: 64 * 1024 * 1024,
            max_redirect_hops: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_minimums() {
        let config = EngineConfig::default();
        assert!(config.cluster_cache_entries >= 8);
        assert!(config.cluster_cache_bytes >= 64 * 1024 * 1024);
        assert_eq!(config.max_redirect_hops, 10);
    }
}

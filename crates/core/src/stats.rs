use serde::{Deserialize, Serialize};

/// Landing-page counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub total_visualizations: u64,
    pub total_users: u64,
    pub total_datasets: u64,
    pub total_insights: u64,
}

impl Default for PlatformStats {
    /// Figures shown when the stats endpoint is unreachable.
    fn default() -> Self {
        Self {
            total_visualizations: 7000,
            total_users: 12000,
            total_datasets: 5,
            total_insights: 2500,
        }
    }
}

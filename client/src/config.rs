use std::{default::Default, time::Duration};

/// Contains Config properties which will be used by the sync engine
#[derive(Clone, Debug, Default)]
pub struct SyncConfig {
    /// Dead-reckoning between authoritative updates
    pub interpolation: InterpolationConfig,
    /// Task inventory retry policy
    pub inventory: InventoryConfig,
    /// Parent/child reconciliation
    pub topology: TopologyConfig,
}

#[derive(Clone, Debug)]
pub struct InterpolationConfig {
    /// Extrapolate position from velocity and acceleration between updates
    pub velocity_interpolate: bool,
    /// Advance freshly received positions by half the round trip
    pub ping_interpolate: bool,
    /// Gap since the last update beyond which prediction stops
    pub max_update_interpolation: Duration,
    /// Gap since the last update beyond which prediction fades out
    pub phase_out_update_interpolation: Duration,
    /// How long a prediction may sit across a region boundary unconfirmed
    pub max_region_crossing_interpolation: Duration,
    /// Duration of one simulator physics step
    pub physics_timestep: Duration,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            velocity_interpolate: true,
            ping_interpolate: true,
            max_update_interpolation: Duration::from_secs(3),
            phase_out_update_interpolation: Duration::from_secs(2),
            max_region_crossing_interpolation: Duration::from_secs(1),
            physics_timestep: Duration::from_secs_f32(1.0 / 45.0),
        }
    }
}

#[derive(Clone, Debug)]
pub struct InventoryConfig {
    /// Delay before refetching after the server repeated the serial we already hold
    pub desync_retry_delay: Duration,
    /// Delay before refetching after a listing older than our own mutations
    pub outdated_retry_delay: Duration,
    /// Stale listings tolerated in a row before the server's serial is
    /// adopted and a failure reported. `None` retries forever.
    pub max_stale_retries: Option<u32>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            desync_retry_delay: Duration::from_secs(5),
            outdated_retry_delay: Duration::from_secs(1),
            max_stale_retries: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TopologyConfig {
    /// How long a child waits for a parent it has not seen yet
    pub orphan_ttl: Duration,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            orphan_ttl: Duration::from_secs(60),
        }
    }
}

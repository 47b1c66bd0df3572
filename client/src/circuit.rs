use std::time::Duration;

use objsync_shared::RegionHandle;

/// Liveness of the transport circuit to each region, as reported by the
/// transport layer.
pub trait CircuitStatus {
    /// The circuit is still considered connected
    fn is_alive(&self, region: RegionHandle) -> bool;

    /// The transport has stopped delivering for the circuit
    fn is_blocked(&self, region: RegionHandle) -> bool;

    /// Wall time since any packet arrived on the circuit
    fn seconds_since_last_packet(&self, region: RegionHandle) -> f32;

    /// Measured round trip time
    fn ping_delay(&self, region: RegionHandle) -> Duration;
}

/// Circuit that is always alive with zero latency. Useful when the engine
/// is driven without a transport.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdealCircuit;

impl CircuitStatus for IdealCircuit {
    fn is_alive(&self, _region: RegionHandle) -> bool {
        true
    }

    fn is_blocked(&self, _region: RegionHandle) -> bool {
        false
    }

    fn seconds_since_last_packet(&self, _region: RegionHandle) -> f32 {
        0.0
    }

    fn ping_delay(&self, _region: RegionHandle) -> Duration {
        Duration::ZERO
    }
}

use std::time::Duration;

use objsync_client::{shared::RegionHandle, CircuitStatus};

/// Circuit whose liveness is set by the test
#[derive(Clone, Debug)]
pub struct FakeCircuit {
    pub alive: bool,
    pub blocked: bool,
    pub silence: f32,
    pub ping: Duration,
}

impl Default for FakeCircuit {
    fn default() -> Self {
        Self {
            alive: true,
            blocked: false,
            silence: 0.0,
            ping: Duration::ZERO,
        }
    }
}

impl FakeCircuit {
    pub fn dead() -> Self {
        Self {
            alive: false,
            ..Self::default()
        }
    }

    pub fn with_ping(ping: Duration) -> Self {
        Self {
            ping,
            ..Self::default()
        }
    }
}

impl CircuitStatus for FakeCircuit {
    fn is_alive(&self, _region: RegionHandle) -> bool {
        self.alive
    }

    fn is_blocked(&self, _region: RegionHandle) -> bool {
        self.blocked
    }

    fn seconds_since_last_packet(&self, _region: RegionHandle) -> f32 {
        self.silence
    }

    fn ping_delay(&self, _region: RegionHandle) -> Duration {
        self.ping
    }
}

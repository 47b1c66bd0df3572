use std::time::{Duration, Instant};

use objsync_client::{
    shared::LocalId, Entity, EntityHandle, ObjectSyncEngine, ObjectUpdateMessage, RegionInfo,
    SyncConfig, UpdateReport,
};

use super::{FakeCircuit, TEST_REGION};

/// Single-region client driven by a manual clock
pub struct TestClient {
    pub engine: ObjectSyncEngine,
    pub circuit: FakeCircuit,
    pub start: Instant,
    pub now: Instant,
}

impl TestClient {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        let mut engine = ObjectSyncEngine::new(config);
        engine.add_region(RegionInfo::new(TEST_REGION));
        let start = Instant::now();
        Self {
            engine,
            circuit: FakeCircuit::default(),
            start,
            now: start,
        }
    }

    /// Seconds since the client was created
    pub fn elapsed(&self) -> f32 {
        (self.now - self.start).as_secs_f32()
    }

    pub fn apply(&mut self, message: &ObjectUpdateMessage) -> UpdateReport {
        self.engine.process_update(message, &self.circuit, self.now)
    }

    /// Moves the clock forward and runs one frame
    pub fn advance(&mut self, millis: u64) {
        let frame_dt = Duration::from_millis(millis);
        self.now += frame_dt;
        self.engine.tick(&self.circuit, self.now, frame_dt);
    }

    /// Runs frames of `step_ms` until `total_ms` have passed
    pub fn tick_every(&mut self, step_ms: u64, total_ms: u64) {
        let mut spent = 0;
        while spent < total_ms {
            let step = step_ms.min(total_ms - spent);
            self.advance(step);
            spent += step;
        }
    }

    pub fn handle(&self, local_id: LocalId) -> Option<EntityHandle> {
        self.engine
            .registry()
            .handle_of_local(TEST_REGION, local_id)
    }

    pub fn entity(&self, local_id: LocalId) -> Option<&Entity> {
        self.handle(local_id)
            .and_then(|handle| self.engine.entity(handle))
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}

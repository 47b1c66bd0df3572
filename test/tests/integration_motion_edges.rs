/// Prediction edge cases: a circuit that stops delivering fades motion out
/// from the first frame, an entity may run into a known neighbour only for
/// a limited time, and non-finite motion never reaches the entity.

use glam::Vec3;
use objsync_client::{shared::RegionHandle, ChangeEvent, RegionInfo, SyncEvent};
use objsync_test::{
    assert_vec3_near, full_message, init_logger, FakeCircuit, TestClient, TestEntityBuilder,
};

const EAST: RegionHandle = RegionHandle::from_origin(256_256, 256_000);

fn client_moving_from(position: Vec3) -> TestClient {
    init_logger();
    let mut client = TestClient::new();
    let block = TestEntityBuilder::new(0x20, 3)
        .position(position)
        .velocity(Vec3::X)
        .build();
    assert_eq!(client.apply(&full_message(1, vec![block])).applied, 1);
    client
}

#[test]
fn dead_circuit_fades_from_the_start() {
    let mut client = client_moving_from(Vec3::new(10.0, 10.0, 0.0));
    client.circuit = FakeCircuit::dead();

    client.tick_every(100, 1000);
    let at_one = client.entity(3).unwrap().position();
    assert!(at_one.x < 11.0);

    client.tick_every(100, 3000);
    let entity = client.entity(3).unwrap();
    assert_vec3_near!(entity.position(), Vec3::new(11.5, 10.0, 0.0), 1e-3);
    assert_eq!(entity.velocity(), Vec3::ZERO);
    assert!(entity.is_static());
}

#[test]
fn blocked_circuit_fades_like_a_dead_one() {
    let mut client = client_moving_from(Vec3::new(10.0, 10.0, 0.0));
    client.circuit = FakeCircuit {
        blocked: true,
        ..FakeCircuit::default()
    };

    client.tick_every(16, 4000);
    let entity = client.entity(3).unwrap();
    assert_vec3_near!(entity.position(), Vec3::new(11.5, 10.0, 0.0), 1e-3);
    assert_eq!(entity.velocity(), Vec3::ZERO);
}

#[test]
fn silent_circuit_fades_from_the_start() {
    let mut client = client_moving_from(Vec3::new(10.0, 10.0, 0.0));
    client.circuit = FakeCircuit {
        silence: 2.5,
        ..FakeCircuit::default()
    };

    client.tick_every(100, 4000);
    assert_vec3_near!(
        client.entity(3).unwrap().position(),
        Vec3::new(11.5, 10.0, 0.0),
        1e-3
    );
}

#[test]
fn crossing_into_known_neighbour_stops_after_timeout() {
    let mut client = client_moving_from(Vec3::new(255.45, 10.0, 0.0));
    client.engine.add_region(RegionInfo::new(EAST));

    // the edge is crossed on the 600 ms frame
    client.tick_every(100, 1000);
    let entity = client.entity(3).unwrap();
    assert_vec3_near!(entity.position(), Vec3::new(256.45, 10.0, 0.0), 1e-3);
    assert_eq!(entity.velocity(), Vec3::X);

    client.tick_every(100, 600);
    assert_eq!(client.entity(3).unwrap().velocity(), Vec3::X);

    client.tick_every(100, 400);
    let entity = client.entity(3).unwrap();
    assert_vec3_near!(entity.position(), Vec3::new(257.15, 10.0, 0.0), 1e-3);
    assert_eq!(entity.velocity(), Vec3::ZERO);
    assert!(entity.is_static());
}

#[test]
fn non_finite_motion_is_rejected() {
    let mut client = client_moving_from(Vec3::new(10.0, 10.0, 0.0));
    client.engine.receive_events();

    let block = TestEntityBuilder::new(0x20, 3)
        .position(Vec3::new(f32::NAN, 10.0, 0.0))
        .velocity(Vec3::X)
        .build();
    client.apply(&full_message(2, vec![block]));

    let handle = client.handle(3).unwrap();
    let mut events = client.engine.receive_events();
    assert!(events.read::<ChangeEvent>().any(|event| event
        == SyncEvent::InvalidUpdate {
            entity: handle,
            local_id: 3,
        }));
    let entity = client.entity(3).unwrap();
    assert_vec3_near!(entity.position(), Vec3::new(10.0, 10.0, 0.0), 1e-6);
    assert!(entity.position().is_finite());
}

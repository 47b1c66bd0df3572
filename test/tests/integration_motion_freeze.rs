/// Dead-reckoning between authoritative updates: an entity keeps moving on
/// its last known velocity, fades out after the phase-out window and stops
/// completely once the update gap passes the freeze limit.

use std::time::Duration;

use glam::Vec3;
use objsync_test::{
    assert_vec3_near, full_message, init_logger, FakeCircuit, TestClient, TestEntityBuilder,
};

fn moving_client() -> TestClient {
    init_logger();
    let mut client = TestClient::new();
    let block = TestEntityBuilder::new(0x10, 1)
        .position(Vec3::new(10.0, 10.0, 0.0))
        .velocity(Vec3::X)
        .build();
    let report = client.apply(&full_message(1, vec![block]));
    assert_eq!(report.applied, 1);
    client
}

#[test]
fn entity_moves_on_last_velocity() {
    let mut client = moving_client();
    client.tick_every(100, 1000);

    let entity = client.entity(1).unwrap();
    assert_vec3_near!(entity.position(), Vec3::new(11.0, 10.0, 0.0), 1e-3);
    assert_eq!(entity.velocity(), Vec3::X);
}

#[test]
fn prediction_freezes_after_three_seconds() {
    let mut client = moving_client();

    client.tick_every(100, 2000);
    let at_two = client.entity(1).unwrap().position();
    assert_vec3_near!(at_two, Vec3::new(12.0, 10.0, 0.0), 1e-3);

    client.tick_every(100, 1000);
    let at_three = client.entity(1).unwrap().position();
    assert_vec3_near!(at_three, Vec3::new(12.5, 10.0, 0.0), 1e-3);

    client.tick_every(100, 500);
    let entity = client.entity(1).unwrap();
    assert_eq!(entity.position(), at_three);
    assert_eq!(entity.velocity(), Vec3::ZERO);
    assert!(entity.is_static());
}

#[test]
fn frozen_position_is_the_same_at_any_frame_rate() {
    let mut fast = moving_client();
    fast.tick_every(16, 4000);
    let mut slow = moving_client();
    slow.tick_every(100, 4000);

    let fast_x = fast.entity(1).unwrap().position().x;
    let slow_x = slow.entity(1).unwrap().position().x;
    assert!((fast_x - slow_x).abs() < 1e-3, "{} vs {}", fast_x, slow_x);
    assert!((slow_x - 12.5).abs() < 1e-3);
}

#[test]
fn fresh_update_restarts_prediction() {
    let mut client = moving_client();
    client.tick_every(100, 3500);
    assert!(client.entity(1).unwrap().is_static());

    let block = TestEntityBuilder::new(0x10, 1)
        .position(Vec3::new(20.0, 10.0, 0.0))
        .velocity(Vec3::Y)
        .build();
    let report = client.apply(&full_message(2, vec![block]));
    assert_eq!(report.applied, 1);

    // half of the last 100 ms frame is added on arrival
    assert_vec3_near!(
        client.entity(1).unwrap().position(),
        Vec3::new(20.0, 10.05, 0.0),
        1e-4
    );

    client.tick_every(100, 1000);
    let entity = client.entity(1).unwrap();
    assert!(!entity.is_static());
    assert_vec3_near!(entity.position(), Vec3::new(20.0, 11.05, 0.0), 1e-3);
}

#[test]
fn selected_entity_is_not_predicted() {
    let mut client = moving_client();
    let handle = client.handle(1).unwrap();
    client.engine.set_selected(handle, true).unwrap();

    client.tick_every(100, 1000);
    assert_eq!(
        client.entity(1).unwrap().position(),
        Vec3::new(10.0, 10.0, 0.0)
    );
}

#[test]
fn arrival_is_advanced_by_half_the_ping() {
    init_logger();
    let mut client = TestClient::new();
    client.circuit = FakeCircuit::with_ping(Duration::from_millis(200));

    let block = TestEntityBuilder::new(0x11, 2)
        .position(Vec3::new(10.0, 10.0, 0.0))
        .velocity(Vec3::new(2.0, 0.0, 0.0))
        .build();
    client.apply(&full_message(1, vec![block]));

    assert_vec3_near!(
        client.entity(2).unwrap().position(),
        Vec3::new(10.2, 10.0, 0.0),
        1e-4
    );
}

/// Per-entity packet ordinals: duplicated and reordered updates must not
/// roll an entity back, and a region handoff starts the ordinal over.

use glam::Vec3;
use objsync_client::{shared::RegionHandle, ChangeFlags, RegionInfo, SyncEvent};
use objsync_test::{
    assert_vec3_near, full_message, init_logger, terse_block, terse_message, TestClient,
    TestEntityBuilder,
};

const EAST: RegionHandle = RegionHandle::from_origin(256_256, 256_000);

fn client_with_entity(packet_id: u32) -> TestClient {
    init_logger();
    let mut client = TestClient::new();
    let block = TestEntityBuilder::new(0x42, 9)
        .position(Vec3::new(50.0, 50.0, 25.0))
        .build();
    assert_eq!(client.apply(&full_message(packet_id, vec![block])).applied, 1);
    client
}

#[test]
fn duplicate_message_is_applied_once() {
    let mut client = client_with_entity(1);
    let update = terse_message(2, vec![terse_block(9, Vec3::new(60.0, 50.0, 25.0), Vec3::ZERO)]);

    assert_eq!(client.apply(&update).applied, 1);
    let after_first = *client.entity(9).unwrap().transform();

    let report = client.apply(&update);
    assert_eq!(report.applied, 0);
    assert_eq!(report.dropped, 1);
    assert!(report.errors.is_empty());
    assert_eq!(*client.entity(9).unwrap().transform(), after_first);
}

#[test]
fn older_message_does_not_roll_back() {
    let mut client = client_with_entity(10);
    client.apply(&terse_message(
        12,
        vec![terse_block(9, Vec3::new(70.0, 50.0, 25.0), Vec3::ZERO)],
    ));

    let report = client.apply(&terse_message(
        11,
        vec![terse_block(9, Vec3::new(10.0, 50.0, 25.0), Vec3::ZERO)],
    ));
    assert_eq!(report.dropped, 1);
    assert_vec3_near!(
        client.entity(9).unwrap().position(),
        Vec3::new(70.0, 50.0, 25.0),
        0.02
    );
    assert_eq!(client.entity(9).unwrap().last_packet_id(), Some(12));
}

#[test]
fn ordinal_far_behind_counts_as_wrapped() {
    let mut client = client_with_entity(100_000);
    let report = client.apply(&terse_message(
        3,
        vec![terse_block(9, Vec3::new(80.0, 50.0, 25.0), Vec3::ZERO)],
    ));
    assert_eq!(report.applied, 1);
    assert_eq!(client.entity(9).unwrap().last_packet_id(), Some(3));
}

#[test]
fn handoff_resets_ordinal_and_shifts_entity() {
    let mut client = client_with_entity(500);
    client.engine.add_region(RegionInfo::new(EAST));
    client.engine.receive_events();

    let block = TestEntityBuilder::new(0x42, 77)
        .position(Vec3::new(2.0, 50.0, 25.0))
        .build();
    let mut message = full_message(1, vec![block]);
    message.region_handle = EAST;
    assert_eq!(client.apply(&message).applied, 1);

    let handle = client
        .engine
        .registry()
        .handle_of_local(EAST, 77)
        .unwrap();
    let entity = client.engine.entity(handle).unwrap();
    assert_eq!(entity.region(), EAST);
    assert_eq!(entity.local_id(), 77);
    assert_eq!(entity.last_packet_id(), Some(1));
    assert_vec3_near!(entity.position(), Vec3::new(2.0, 50.0, 25.0), 1e-4);
    assert!(client.handle(9).is_none());

    assert!(client.engine.events().iter().any(|event| matches!(
        event,
        SyncEvent::Changed { entity, flags }
            if *entity == handle && flags.contains(ChangeFlags::SHIFTED)
    )));
}

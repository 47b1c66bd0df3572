/// Packed full updates carry their optional groups behind a presence mask.
/// These drive the whole path from wire bytes to entity state.

use glam::Vec3;
use objsync_client::{ChangeEvent, SyncEvent};
use objsync_shared::{ExtraParam, ExtraParamType, LightParams};
use objsync_test::{
    assert_vec3_near, compressed_message, full_message, init_logger, PackedEntityBuilder,
    TestClient, TestEntityBuilder,
};

fn light() -> ExtraParam {
    ExtraParam::Light(LightParams {
        color: [255, 200, 100, 255],
        radius: 10.0,
        cutoff: 0.5,
        falloff: 0.75,
    })
}

#[test]
fn packed_full_creates_entity_with_optional_groups() {
    init_logger();
    let mut client = TestClient::new();
    let block = PackedEntityBuilder::new(0x77, 12)
        .position(Vec3::new(64.0, 32.0, 22.0))
        .angular_velocity(Vec3::new(0.0, 0.0, 0.5))
        .media_url("http://example.com/board")
        .name_values("FirstName STRING RW SV Ada")
        .extra_param(light())
        .build();

    let report = client.apply(&compressed_message(1, vec![block]));
    assert_eq!(report.applied, 1);
    assert!(report.errors.is_empty());

    let entity = client.entity(12).unwrap();
    assert_vec3_near!(entity.position(), Vec3::new(64.0, 32.0, 22.0), 1e-5);
    assert_eq!(entity.angular_velocity(), Vec3::new(0.0, 0.0, 0.5));
    assert_eq!(entity.material(), 3);
    assert_eq!(entity.media_url(), Some("http://example.com/board"));
    assert_eq!(entity.name_value("FirstName").unwrap().value, "Ada");
    assert_eq!(entity.extra_param(ExtraParamType::Light), Some(&light()));

    let changes: Vec<_> = client.engine.events_mut().read::<ChangeEvent>().collect();
    assert!(changes.contains(&SyncEvent::MediaUrlChanged {
        entity: client.handle(12).unwrap()
    }));
}

#[test]
fn packed_child_links_to_raw_parent() {
    init_logger();
    let mut client = TestClient::new();
    let parent = TestEntityBuilder::new(0x70, 40).build();
    client.apply(&full_message(1, vec![parent]));

    let child = PackedEntityBuilder::new(0x71, 41)
        .parent(40)
        .position(Vec3::new(0.0, 0.0, 1.0))
        .build();
    assert_eq!(client.apply(&compressed_message(2, vec![child])).applied, 1);

    let parent = client.handle(40).unwrap();
    assert_eq!(client.entity(41).unwrap().parent(), Some(parent));
}

#[test]
fn truncated_packed_block_is_dropped_alone() {
    init_logger();
    let mut client = TestClient::new();
    let good = PackedEntityBuilder::new(0x78, 13).build();
    let bad = objsync_client::UpdateBlock::Packed {
        data: vec![0; 10],
        update_flags: None,
    };

    let report = client.apply(&compressed_message(1, vec![bad, good]));
    assert_eq!(report.applied, 1);
    assert_eq!(report.dropped, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(client.entity(13).is_some());
}

#[test]
fn removed_extra_param_is_reported_unused() {
    init_logger();
    let mut client = TestClient::new();
    let lit = TestEntityBuilder::new(0x79, 14).extra_param(light()).build();
    client.apply(&full_message(1, vec![lit]));
    client.engine.receive_events();

    let dark = TestEntityBuilder::new(0x79, 14).build();
    client.apply(&full_message(2, vec![dark]));

    let handle = client.handle(14).unwrap();
    assert!(client.engine.events().iter().any(|event| *event
        == SyncEvent::ExtraParamChanged {
            entity: handle,
            kind: ExtraParamType::Light,
            in_use: false,
        }));
    assert_eq!(client.entity(14).unwrap().extra_param(ExtraParamType::Light), None);
}

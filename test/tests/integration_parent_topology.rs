/// Parent/child reconciliation across out-of-order arrivals: children that
/// name a parent the client has not seen yet wait for it, and a pair of
/// updates that would close a parent loop kills both ends and asks the
/// simulator to resend them.

use glam::Vec3;
use objsync_client::{
    CacheMissKind, LifecycleEvent, OutboundRequest, SyncEvent, TopologyEvent, TopologyState,
};
use objsync_test::{assert_gone, full_message, init_logger, TestClient, TestEntityBuilder, TEST_REGION};

#[test]
fn orphan_is_released_when_parent_arrives() {
    init_logger();
    let mut client = TestClient::new();

    let child = TestEntityBuilder::new(0xC0, 5)
        .parent(42)
        .position(Vec3::new(1.0, 0.0, 0.0))
        .build();
    client.apply(&full_message(1, vec![child]));

    let child_handle = client.handle(5).unwrap();
    assert_eq!(
        client.entity(5).unwrap().topology(),
        TopologyState::Orphaned { awaiting: 42 }
    );
    assert!(client.engine.events().iter().any(|event| matches!(
        event,
        SyncEvent::Orphaned { entity, awaiting: 42 } if *entity == child_handle
    )));
    client.engine.receive_events();

    let parent = TestEntityBuilder::new(0xA0, 42)
        .position(Vec3::new(100.0, 100.0, 20.0))
        .build();
    client.apply(&full_message(2, vec![parent]));

    let parent_handle = client.handle(42).unwrap();
    let child_entity = client.entity(5).unwrap();
    assert_eq!(child_entity.parent(), Some(parent_handle));
    assert!(!child_entity.is_orphaned());
    assert_eq!(
        client.entity(42).unwrap().children(),
        &[child_handle][..]
    );

    let topology: Vec<_> = client.engine.events_mut().read::<TopologyEvent>().collect();
    assert!(topology.contains(&SyncEvent::TopologyChanged {
        entity: child_handle,
        old_parent: None,
        new_parent: Some(parent_handle),
    }));
}

#[test]
fn orphan_gives_up_after_waiting() {
    init_logger();
    let mut client = TestClient::new();
    let child = TestEntityBuilder::new(0xC1, 6).parent(43).build();
    client.apply(&full_message(1, vec![child]));
    assert!(client.entity(6).unwrap().is_orphaned());

    client.advance(61_000);
    let entity = client.entity(6).unwrap();
    assert_eq!(entity.topology(), TopologyState::NoParent);
}

#[test]
fn parent_cycle_kills_both_and_requests_them() {
    init_logger();
    let mut client = TestClient::new();

    let a = TestEntityBuilder::new(0xA, 1).parent(2).build();
    let b = TestEntityBuilder::new(0xB, 2).parent(1).build();
    let report = client.apply(&full_message(1, vec![a, b]));
    assert_eq!(report.applied, 1);
    assert_eq!(report.dropped, 1);

    assert_gone!(client, 0xA);
    assert_gone!(client, 0xB);
    assert!(client.engine.registry().is_empty());

    let destroyed = client
        .engine
        .events_mut()
        .read::<LifecycleEvent>()
        .filter(|event| matches!(event, SyncEvent::Destroyed { .. }))
        .count();
    assert_eq!(destroyed, 2);

    let outbound = client.engine.take_outbound();
    let requested: Vec<_> = outbound
        .iter()
        .filter_map(|request| match request {
            OutboundRequest::RequestObjects {
                region,
                local_ids,
                kind: CacheMissKind::Full,
            } if *region == TEST_REGION => Some(local_ids.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(requested.len(), 1);
    let mut local_ids = requested[0].clone();
    local_ids.sort_unstable();
    assert_eq!(local_ids, vec![1, 2]);
}

#[test]
fn resent_pair_without_loop_links_normally() {
    init_logger();
    let mut client = TestClient::new();
    let a = TestEntityBuilder::new(0xA, 1).parent(2).build();
    let b = TestEntityBuilder::new(0xB, 2).parent(1).build();
    client.apply(&full_message(1, vec![a, b]));
    client.engine.take_outbound();

    let a = TestEntityBuilder::new(0xA, 1).parent(2).build();
    let b = TestEntityBuilder::new(0xB, 2).build();
    let report = client.apply(&full_message(2, vec![b, a]));
    assert_eq!(report.applied, 2);

    let parent = client.handle(2).unwrap();
    assert_eq!(client.entity(1).unwrap().parent(), Some(parent));
    assert_eq!(client.entity(2).unwrap().parent(), None);
}

#[test]
fn killing_parent_detaches_children() {
    init_logger();
    let mut client = TestClient::new();
    let parent = TestEntityBuilder::new(0xA0, 42).build();
    let child = TestEntityBuilder::new(0xC0, 5).parent(42).build();
    client.apply(&full_message(1, vec![parent, child]));
    assert!(client.entity(5).unwrap().parent().is_some());

    client.engine.kill_object(TEST_REGION, 42).unwrap();
    assert_gone!(client, 0xA0);
    let child = client.entity(5).unwrap();
    assert_eq!(child.parent(), None);
    assert_eq!(child.topology(), TopologyState::NoParent);
}

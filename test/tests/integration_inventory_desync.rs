/// Task inventory coherence: the client counts its own edits into an
/// expected serial and refuses to settle on a listing the simulator has not
/// caught up with, retrying on a timer instead.

use glam::Vec3;
use uuid::Uuid;

use objsync_client::{
    shared::{AssetType, GlobalId, InventoryItem, InventoryKey, InventorySerial},
    InventoryEvent, InventoryState, OutboundRequest, SyncEvent,
};
use objsync_test::{full_message, init_logger, TestClient, TestEntityBuilder, TEST_REGION};

const OWNER: u128 = 0x42;

fn client_with_entity() -> TestClient {
    init_logger();
    let mut client = TestClient::new();
    let block = TestEntityBuilder::new(OWNER, 9)
        .position(Vec3::new(30.0, 30.0, 21.0))
        .build();
    client.apply(&full_message(1, vec![block]));
    client.engine.receive_events();
    client
}

fn note(id: u128) -> InventoryItem {
    InventoryItem {
        asset_type: AssetType::Notecard,
        ..InventoryItem::category(Uuid::from_u128(id), Uuid::from_u128(OWNER), "note")
    }
}

fn reply(client: &mut TestClient, serial: u16) {
    client
        .engine
        .on_task_inventory_reply(
            GlobalId::from_u128(OWNER),
            InventorySerial::new(serial),
            String::new(),
            client.now,
        )
        .unwrap();
}

fn task_requests(client: &mut TestClient) -> usize {
    client
        .engine
        .take_outbound()
        .iter()
        .filter(|request| matches!(
            request,
            OutboundRequest::RequestTaskInventory { region, local_id: 9, .. } if *region == TEST_REGION
        ))
        .count()
}

#[test]
fn stuck_serial_waits_five_seconds_then_refetches() {
    let mut client = client_with_entity();
    let handle = client.handle(9).unwrap();

    reply(&mut client, 5);
    for id in 1..=2 {
        client
            .engine
            .update_inventory(handle, note(id), InventoryKey::Item, true)
            .unwrap();
    }
    let cache = client.entity(9).unwrap().inventory();
    assert_eq!(cache.serial(), InventorySerial::new(5));
    assert_eq!(cache.expected_serial(), InventorySerial::new(7));
    client.engine.take_outbound();
    client.engine.receive_events();

    // the simulator has not applied our two edits yet
    reply(&mut client, 5);
    let desyncs: Vec<_> = client.engine.events_mut().read::<InventoryEvent>().collect();
    assert_eq!(
        desyncs,
        vec![SyncEvent::InventoryDesync {
            entity: handle,
            server_serial: InventorySerial::new(5),
            expected: InventorySerial::new(7),
        }]
    );
    assert_eq!(
        client.entity(9).unwrap().inventory().state(),
        InventoryState::Waiting
    );

    client.advance(4000);
    assert_eq!(task_requests(&mut client), 0);

    client.advance(1000);
    assert_eq!(task_requests(&mut client), 1);
    assert_eq!(
        client.entity(9).unwrap().inventory().state(),
        InventoryState::Pending
    );

    reply(&mut client, 7);
    let cache = client.entity(9).unwrap().inventory();
    assert_eq!(cache.state(), InventoryState::Stopped);
    assert_eq!(cache.serial(), InventorySerial::new(7));
    assert_eq!(cache.expected_serial(), InventorySerial::new(7));
    let contents = cache.contents().unwrap();
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0].name, "Contents");
}

#[test]
fn request_serves_cached_listing() {
    let mut client = client_with_entity();
    let handle = client.handle(9).unwrap();
    reply(&mut client, 3);
    client.engine.take_outbound();
    client.engine.receive_events();

    let fetch = client.engine.request_inventory(handle).unwrap();
    assert_eq!(fetch, None);
    assert_eq!(task_requests(&mut client), 0);
    assert!(client.engine.events().iter().any(|event| matches!(
        event,
        SyncEvent::InventoryChanged { serial, .. } if *serial == InventorySerial::new(3)
    )));
}

#[test]
fn dirty_listing_is_refetched() {
    let mut client = client_with_entity();
    let handle = client.handle(9).unwrap();
    reply(&mut client, 3);
    client.engine.take_outbound();

    client.engine.dirty_inventory(handle).unwrap();
    let fetch = client.engine.request_inventory(handle).unwrap();
    assert!(fetch.is_some());
    assert_eq!(task_requests(&mut client), 1);
}

#[test]
fn killed_entity_drops_inventory_work() {
    let mut client = client_with_entity();
    let handle = client.handle(9).unwrap();
    let fetch = client.engine.fetch_inventory(handle).unwrap();
    assert_eq!(client.engine.inventory().task_count(), 1);

    client.engine.kill_object(TEST_REGION, 9).unwrap();
    assert_eq!(client.engine.inventory().task_count(), 0);
    assert!(client.engine.inventory().pending_request(fetch).is_none());
}

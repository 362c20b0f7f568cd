//! E2E tests covering push-driven state reduction and poll-driven
//! subscription scheduling against a shared, directly-registered device.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::TestHarness;
use meross_protocol::envelope::Method;
use meross_push::ReducedEvent;
use meross_subscribe::{Section, SubscriptionConfig, SubscriptionEvent};

#[tokio::test]
async fn e2e_toggle_push_updates_registry_state() {
    let harness = TestHarness::new();
    harness.register_device("uuid-1", "mss310", &["Appliance.Control.ToggleX"]);

    let events = harness.push("uuid-1", "Appliance.Control.ToggleX", serde_json::json!({"togglex": {"channel": 0, "onoff": 1}}));
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ReducedEvent::State(change) if change.change_type == "isOn" && change.new_value == serde_json::json!(true)));

    let cached = harness.registry.with_device("uuid-1", |d| d.cached_state("Appliance.Control.ToggleX", 0).cloned()).flatten();
    assert!(cached.is_some());
}

#[tokio::test]
async fn e2e_online_push_then_poll_reflects_transition() {
    let harness = TestHarness::new();
    harness.register_device("uuid-1", "mss310", &["Appliance.Control.ToggleX"]);

    let events = harness.push("uuid-1", "Appliance.System.Online", serde_json::json!({"online": {"status": 3}}));
    assert_eq!(events.len(), 1);
    match &events[0] {
        ReducedEvent::Online { uuid, current, .. } => {
            assert_eq!(uuid, "uuid-1");
            assert_eq!(*current, meross_protocol::device::OnlineStatus::Offline);
        }
        other => panic!("expected an Online transition, got {other:?}"),
    }

    let snapshot = harness.registry.get("uuid-1").unwrap();
    assert_eq!(snapshot.online_status, meross_protocol::device::OnlineStatus::Offline);
}

#[tokio::test]
async fn e2e_hub_sensor_push_routes_to_sub_device_and_freshness_updates() {
    let harness = Arc::new(TestHarness::new());
    harness.register_device("hub-1", "msh300", &["Appliance.Hub.Sensor.TempHum", "Appliance.Hub.SubdeviceList"]);
    harness.register_hub_sub_device("hub-1", "sub-1", "ms100", &["Appliance.Hub.Sensor.TempHum"]);

    let (manager, mut rx) = harness.subscription_manager();
    manager.notify_push("hub-1", "Appliance.Hub.Sensor.TempHum");

    let events = harness.push("hub-1", "Appliance.Hub.Sensor.TempHum", serde_json::json!({"tempHum": {"id": "sub-1", "temperature": 212, "humidity": 550}}));
    assert!(!events.is_empty());
    assert!(rx.try_recv().is_err(), "push-driven reduction doesn't itself emit a subscription event");
}

#[tokio::test]
async fn e2e_poll_driven_electricity_refresh_emits_device_update() {
    let harness = Arc::new(TestHarness::new());
    harness.register_device("uuid-1", "mss310", &["Appliance.Control.Electricity"]);

    let (manager, mut rx) = harness.subscription_manager();
    manager.subscribe_device(
        "uuid-1",
        SubscriptionConfig { device_state_interval: Duration::from_secs(3600), electricity_interval: Some(Duration::from_millis(10)), smart_caching: false, ..Default::default() },
    );

    // Drain the channel's request and ack it with a plausible electricity
    // reading once the poll task has had a chance to fire.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if let Some(sent) = harness.channel.last_published() {
            if let Ok(envelope) = serde_json::from_slice::<meross_protocol::Envelope>(&sent.payload) {
                if envelope.header.namespace == Section::Electricity.namespace() {
                    let mut ack = envelope;
                    ack.header.method = Method::GetAck;
                    ack.payload = serde_json::json!({"electricity": {"channel": 0, "power": 1200}});
                    let bytes = serde_json::to_vec(&ack).unwrap();
                    harness.mqtt.handle_inbound(&meross_protocol::topics::device_publish("uuid-1"), &bytes);
                    break;
                }
            }
        }
        if tokio::time::Instant::now() > deadline {
            panic!("electricity poll never published a request");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.expect("subscription event expected").expect("channel open");
    match event {
        SubscriptionEvent::DeviceUpdate(update) => assert_eq!(update.uuid, "uuid-1"),
        other => panic!("expected a DeviceUpdate, got {other:?}"),
    }

    manager.destroy();
}

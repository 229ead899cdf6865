//! Hold dispatcher gesture lifecycle against a recording channel


use std::time::Duration;

use rexlink_core::{
    CancelReason, ControlRequest, Delivery, Direction, GestureState, Phase, PressOutcome, Region,
    Selection, SubPart,
};
use test_utils::{rex_dispatcher, record_outbound, FakeChannel, Scripted};
use tokio::time::sleep;

fn select(region: Region, part: SubPart) -> Selection {
    Selection::new(region, part).unwrap()
}

/// Phases of the packets written so far, in order
fn phases(channel: &FakeChannel) -> Vec<Option<Phase>> {
    channel.packets().into_iter().map(|p| p.phase).collect()
}

// ----------------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_tail_left_sets_level_and_releases_to_neutral() {
    let channel = FakeChannel::new(true);
    let dispatcher = rex_dispatcher(channel.clone());
    dispatcher.select(select(Region::TailSpine, SubPart::Tail)).await;

    assert_eq!(dispatcher.press(Direction::Left).await, PressOutcome::Started);
    assert_eq!(dispatcher.state(), GestureState::Active(Direction::Left));
    assert!(dispatcher.release().await);
    assert_eq!(dispatcher.state(), GestureState::Idle);

    let packets = channel.packets();
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0].cmd, "rex_tail_set");
    assert_eq!(packets[0].level, Some(1.0));
    assert_eq!(packets[0].phase, Some(Phase::Start));
    assert_eq!(packets[1].cmd, "rex_tail_set");
    assert_eq!(packets[1].level, Some(0.5));
    assert_eq!(packets[1].phase, Some(Phase::Stop));
}

#[tokio::test(start_paused = true)]
async fn test_walk_forward_holds_on_cadence() {
    let channel = FakeChannel::new(true);
    let dispatcher = rex_dispatcher(channel.clone());
    dispatcher.select(select(Region::LegsPelvis, SubPart::Legs)).await;

    dispatcher.press(Direction::Up).await;
    sleep(Duration::from_millis(500)).await;

    let packets = channel.packets();
    assert_eq!(packets.len(), 4);
    assert!(packets.iter().all(|p| p.cmd == "rex_walk_forward"));
    assert_eq!(packets[0].phase, Some(Phase::Start));
    assert!(packets[1..].iter().all(|p| p.phase == Some(Phase::Hold)));

    dispatcher.release().await;
    let packets = channel.packets();
    assert_eq!(packets.len(), 5);
    assert_eq!(packets[4].cmd, "rex_walk_stop");
}

#[tokio::test(start_paused = true)]
async fn test_preview_when_not_connected() {
    let channel = FakeChannel::new(false);
    let dispatcher = rex_dispatcher(channel.clone());
    let records = record_outbound(&dispatcher);
    dispatcher.select(select(Region::LegsPelvis, SubPart::Legs)).await;

    assert_eq!(dispatcher.press(Direction::Up).await, PressOutcome::Started);
    sleep(Duration::from_millis(150)).await;
    dispatcher.release().await;

    assert_eq!(channel.attempts(), 0);
    let records = records.lock().unwrap();
    let summary: Vec<(Delivery, Phase)> = records.iter().map(|r| (r.delivery, r.phase)).collect();
    assert_eq!(
        summary,
        vec![
            (Delivery::Preview, Phase::Start),
            (Delivery::Preview, Phase::Hold),
            (Delivery::Preview, Phase::Stop),
        ]
    );
    assert_eq!(
        records[0].line,
        "{\"target\":\"legsPelvis\",\"part\":\"legs\",\"cmd\":\"rex_walk_forward\",\"phase\":\"start\",\"rate\":0.6}\n"
    );
}

// ----------------------------------------------------------------------------
// Gesture Invariants
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_one_start_one_stop_per_cycle() {
    let channel = FakeChannel::new(true);
    let dispatcher = rex_dispatcher(channel.clone());
    dispatcher.select(select(Region::HeadNeck, SubPart::Head)).await;

    for hold_ms in [0u64, 100, 141, 710] {
        dispatcher.press(Direction::Right).await;
        sleep(Duration::from_millis(hold_ms)).await;
        dispatcher.release().await;
    }
    // nothing fires after the last stop
    sleep(Duration::from_secs(2)).await;

    let mut cycles = Vec::new();
    let mut current: Vec<Option<Phase>> = Vec::new();
    for phase in phases(&channel) {
        current.push(phase);
        if phase == Some(Phase::Stop) {
            cycles.push(std::mem::take(&mut current));
        }
    }
    assert!(current.is_empty(), "packets after final stop: {:?}", current);
    assert_eq!(cycles.len(), 4);

    let holds: Vec<usize> = cycles
        .iter()
        .map(|cycle| {
            assert_eq!(cycle.first(), Some(&Some(Phase::Start)));
            assert_eq!(cycle.last(), Some(&Some(Phase::Stop)));
            cycle[1..cycle.len() - 1]
                .iter()
                .filter(|p| **p == Some(Phase::Hold))
                .count()
        })
        .collect();
    assert_eq!(holds, vec![0, 0, 1, 5]);
}

#[tokio::test(start_paused = true)]
async fn test_forbidden_direction_sends_nothing() {
    let channel = FakeChannel::new(true);
    let dispatcher = rex_dispatcher(channel.clone());
    let records = record_outbound(&dispatcher);
    dispatcher.select(select(Region::TailSpine, SubPart::Tail)).await;

    assert_eq!(dispatcher.press(Direction::Up).await, PressOutcome::Rejected);
    assert_eq!(dispatcher.state(), GestureState::Idle);
    sleep(Duration::from_millis(500)).await;
    assert!(!dispatcher.release().await);

    assert_eq!(channel.attempts(), 0);
    assert!(records.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_new_press_stops_previous_direction_first() {
    let channel = FakeChannel::new(true);
    let dispatcher = rex_dispatcher(channel.clone());
    dispatcher.select(select(Region::LegsPelvis, SubPart::Legs)).await;

    dispatcher.press(Direction::Up).await;
    sleep(Duration::from_millis(150)).await;
    dispatcher.press(Direction::Left).await;
    assert_eq!(dispatcher.state(), GestureState::Active(Direction::Left));
    sleep(Duration::from_millis(150)).await;
    dispatcher.release().await;

    let cmds: Vec<String> = channel.packets().into_iter().map(|p| p.cmd).collect();
    assert_eq!(
        cmds,
        vec![
            "rex_walk_forward",
            "rex_walk_forward",
            "rex_walk_stop",
            "rex_turn_left",
            "rex_turn_left",
            "rex_walk_stop",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_selection_change_ends_active_gesture() {
    let channel = FakeChannel::new(true);
    let dispatcher = rex_dispatcher(channel.clone());
    dispatcher.select(select(Region::TailSpine, SubPart::Spine)).await;

    dispatcher.press(Direction::Up).await;
    dispatcher.select(select(Region::Arms, SubPart::Arms)).await;
    assert_eq!(dispatcher.state(), GestureState::Idle);
    assert_eq!(dispatcher.selection(), select(Region::Arms, SubPart::Arms));
    sleep(Duration::from_millis(400)).await;

    let packets = channel.packets();
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[1].cmd, "rex_spine_set");
    assert_eq!(packets[1].target, Region::TailSpine);
    assert_eq!(packets[1].phase, Some(Phase::Stop));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_sends_single_stop() {
    let channel = FakeChannel::new(true);
    let dispatcher = rex_dispatcher(channel.clone());
    dispatcher.select(select(Region::Arms, SubPart::Claws)).await;

    dispatcher.press(Direction::Center).await;
    assert!(dispatcher.cancel(CancelReason::PointerLeft).await);
    assert!(!dispatcher.cancel(CancelReason::FocusLost).await);
    assert!(!dispatcher.release().await);

    let packets = channel.packets();
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0].phase, None);
    assert_eq!(packets[1].cmd, "rex_claw_snap");
    assert_eq!(packets[1].phase, Some(Phase::Stop));
}

// ----------------------------------------------------------------------------
// Failure Handling
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_write_failures_do_not_stick_the_gesture() {
    let channel = FakeChannel::new(true);
    let dispatcher = rex_dispatcher(channel.clone());
    dispatcher.select(select(Region::Arms, SubPart::Arms)).await;

    // start and both holds fail
    channel.script(&[Scripted::Fail, Scripted::Fail, Scripted::Fail]);
    assert_eq!(dispatcher.press(Direction::Up).await, PressOutcome::Started);
    sleep(Duration::from_millis(300)).await;
    assert!(dispatcher.release().await);
    assert_eq!(dispatcher.state(), GestureState::Idle);

    let packets = channel.packets();
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].cmd, "rex_arms_stop");
}

#[tokio::test(start_paused = true)]
async fn test_peer_drop_mid_gesture_switches_to_preview() {
    let channel = FakeChannel::new(true);
    let dispatcher = rex_dispatcher(channel.clone());
    let records = record_outbound(&dispatcher);
    dispatcher.select(select(Region::LegsPelvis, SubPart::Legs)).await;

    dispatcher.press(Direction::Down).await;
    channel.set_connected(false);
    sleep(Duration::from_millis(150)).await;
    dispatcher.release().await;

    let deliveries: Vec<Delivery> = records.lock().unwrap().iter().map(|r| r.delivery).collect();
    assert_eq!(
        deliveries,
        vec![Delivery::Transmitted, Delivery::Preview, Delivery::Preview]
    );
    assert_eq!(dispatcher.state(), GestureState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_drop_queues_stop_and_disarms_timer() {
    let channel = FakeChannel::new(true);
    {
        let dispatcher = rex_dispatcher(channel.clone());
        dispatcher.select(select(Region::TailSpine, SubPart::Tail)).await;
        dispatcher.press(Direction::Right).await;
        sleep(Duration::from_millis(150)).await;
    }
    sleep(Duration::from_secs(1)).await;

    let packets = channel.packets();
    let levels: Vec<Option<f64>> = packets.iter().map(|p| p.level).collect();
    assert_eq!(levels, vec![Some(0.0), Some(0.0), Some(0.5)]);
    assert_eq!(packets[2].phase, Some(Phase::Stop));
}

#[tokio::test(start_paused = true)]
async fn test_explicit_request_accepts_legacy_form() {
    let channel = FakeChannel::new(true);
    let dispatcher = rex_dispatcher(channel.clone());

    let request: ControlRequest = rexlink_core::codec::parse_request(
        r#"{"target":"tailSpine","direction":"center","phase":"start"}"#,
    )
    .unwrap();
    assert!(dispatcher.send_request(&request).await.unwrap());

    let bad: ControlRequest = rexlink_core::codec::parse_request(
        r#"{"target":"tailSpine","part":"tail","direction":"up","phase":"start"}"#,
    )
    .unwrap();
    assert!(!dispatcher.send_request(&bad).await.unwrap());

    let packets = channel.packets();
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].cmd, "rex_tail_wag");
    assert_eq!(packets[0].part, SubPart::Full);
    assert_eq!(dispatcher.state(), GestureState::Idle);
}

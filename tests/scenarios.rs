mod common;

use std::cell::Cell;
use std::rc::Rc;

use embassy_futures::block_on;
use embassy_futures::join::join;
use embassy_sync::channel::Channel;
use embedded_hal_async::i2c::ErrorKind;
use helmet_telemetry::drivers::gyro::create_default_gyro;
use helmet_telemetry::ipc::{Notification, NotifyQueue, QueuedNotifier};
use helmet_telemetry::tasks::{CycleOutcome, OrientationSampler, RangeSampler};
use helmet_telemetry::{ChannelKey, ConnectionState};

use common::{ranger, Busy, GyroBus, Lines, Now, Pace, StepClock};

const GYRO_SAMPLE: [u8; 6] = [0x00, 0x83, 0xFF, 0x9C, 0x00, 0x05];

fn drain(queue: &NotifyQueue) -> Vec<(ChannelKey, String)> {
    let mut out = Vec::new();
    while let Ok(Notification { key, payload }) = queue.try_receive() {
        out.push((key, payload.as_str().to_string()));
    }
    out
}

#[test]
fn front_echo_and_left_timeout_reach_the_queue() {
    let queue: NotifyQueue = Channel::new();
    let notifier = QueuedNotifier::new(&queue);
    let link = ConnectionState::new();
    link.set_connected(true);

    let now: Now = Rc::new(Cell::new(0));
    let mut range = RangeSampler::new(
        [
            ranger(&now, Some(588)),
            ranger(&now, None),
            ranger(&now, Some(588)),
        ],
        Busy(now.clone()),
        Pace::default(),
        StepClock(now.clone()),
        &link,
        &notifier,
    );

    block_on(range.run_cycle());

    assert_eq!(
        drain(&queue),
        [
            (ChannelKey::Front, "9".to_string()),
            (ChannelKey::Left, "400".to_string()),
            (ChannelKey::Right, "9".to_string()),
        ]
    );
}

#[test]
fn gyro_triplet_reaches_the_queue() {
    let queue: NotifyQueue = Channel::new();
    let notifier = QueuedNotifier::new(&queue);
    let link = ConnectionState::new();
    link.set_connected(true);

    let gyro = block_on(create_default_gyro(
        GyroBus::new([Ok(GYRO_SAMPLE)]),
        &mut Pace::default(),
    ))
    .unwrap();
    let mut orientation =
        OrientationSampler::new(gyro, Pace::default(), Lines::default(), &link, &notifier);

    block_on(orientation.run_cycle());

    assert_eq!(
        drain(&queue),
        [(ChannelKey::Orientation, "1.00,-0.76,0.04".to_string())]
    );
}

#[test]
fn samplers_interleave_without_mixing_streams() {
    let queue: NotifyQueue = Channel::new();
    let notifier = QueuedNotifier::new(&queue);
    let link = ConnectionState::new();
    link.set_connected(true);

    let now: Now = Rc::new(Cell::new(0));
    let mut range = RangeSampler::new(
        [
            ranger(&now, Some(1000)),
            ranger(&now, Some(2000)),
            ranger(&now, None),
        ],
        Busy(now.clone()),
        Pace::default(),
        StepClock(now.clone()),
        &link,
        &notifier,
    );

    let gyro = block_on(create_default_gyro(
        GyroBus::new([Ok(GYRO_SAMPLE), Err(ErrorKind::Other), Ok(GYRO_SAMPLE)]),
        &mut Pace::default(),
    ))
    .unwrap();
    let mut orientation =
        OrientationSampler::new(gyro, Pace::default(), Lines::default(), &link, &notifier);

    // Two range cycles against three gyro cycles, one of them failing; the queue (8 deep) is
    // drained after each round.
    let mut published = Vec::new();
    block_on(async {
        for round in 0..2 {
            join(range.run_cycle(), async {
                orientation.run_cycle().await;
                if round == 1 {
                    orientation.run_cycle().await;
                }
            })
            .await;
            published.extend(drain(&queue));
        }
    });

    let range_keys: Vec<ChannelKey> = published
        .iter()
        .map(|(k, _)| *k)
        .filter(|k| *k != ChannelKey::Orientation)
        .collect();
    assert_eq!(
        range_keys,
        [
            ChannelKey::Front,
            ChannelKey::Left,
            ChannelKey::Right,
            ChannelKey::Front,
            ChannelKey::Left,
            ChannelKey::Right,
        ]
    );

    let gyro_payloads: Vec<&str> = published
        .iter()
        .filter(|(k, _)| *k == ChannelKey::Orientation)
        .map(|(_, p)| p.as_str())
        .collect();
    assert_eq!(gyro_payloads, ["1.00,-0.76,0.04", "1.00,-0.76,0.04"]);
    for payload in gyro_payloads {
        assert_eq!(payload.split(',').count(), 3);
    }
    assert_eq!(notifier.dropped(), 0);
}

#[test]
fn disconnected_link_keeps_queue_empty_but_feeds_plotter() {
    let queue: NotifyQueue = Channel::new();
    let notifier = QueuedNotifier::new(&queue);
    let link = ConnectionState::new();

    let gyro = block_on(create_default_gyro(
        GyroBus::new([Ok(GYRO_SAMPLE), Ok(GYRO_SAMPLE)]),
        &mut Pace::default(),
    ))
    .unwrap();
    let mut orientation =
        OrientationSampler::new(gyro, Pace::default(), Lines::default(), &link, &notifier);

    let first = block_on(orientation.run_cycle());
    assert!(matches!(first, CycleOutcome::Sampled(_)));
    assert!(drain(&queue).is_empty());

    // Peer shows up between cycles
    link.set_connected(true);
    let second = block_on(orientation.run_cycle());
    assert!(matches!(second, CycleOutcome::Published(_)));
    assert_eq!(drain(&queue).len(), 1);
}

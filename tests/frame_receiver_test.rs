/// 广播帧接收测试
///
/// 多个任务通过通道向同一个共享会话投递帧

use std::time::Duration;

use tokio::sync::mpsc;

use officenav::algorithms::{RangingTriplet, encode_payload};
use officenav::config::DEFAULT_INITIATOR_ADDRESS;
use officenav::scanner::{
    AdvertisementFrame, InitiatorFilter, ReceiverStats, SharedSession, run_receiver, spawn_replay,
};

const OTHER_ADDRESS: &str = "11:22:33:44:55:66";

fn payload(ids: [u8; 3], distances: [f32; 3]) -> String {
    let triplets = [
        RangingTriplet::new(ids[0], -60, distances[0]),
        RangingTriplet::new(ids[1], -60, distances[1]),
        RangingTriplet::new(ids[2], -60, distances[2]),
    ];
    encode_payload(&triplets).unwrap()
}

fn good_payload() -> String {
    payload([0xF1, 0xF2, 0xF3], [13f32.sqrt(), 13f32.sqrt(), 8f32.sqrt()])
}

#[tokio::test]
async fn test_receiver_counts_every_outcome() {
    let (tx, rx) = mpsc::channel(16);
    let session = SharedSession::default();
    let filter = InitiatorFilter::for_address(DEFAULT_INITIATOR_ADDRESS).unwrap();
    let receiver = tokio::spawn(run_receiver(rx, session.clone(), filter));

    let frames = vec![
        AdvertisementFrame::new(DEFAULT_INITIATOR_ADDRESS, good_payload(), 1),
        AdvertisementFrame::new(OTHER_ADDRESS, good_payload(), 2),
        AdvertisementFrame::new(DEFAULT_INITIATOR_ADDRESS.to_lowercase(), good_payload(), 1),
        AdvertisementFrame::new(DEFAULT_INITIATOR_ADDRESS, "ZZ", 3),
        AdvertisementFrame::new(
            DEFAULT_INITIATOR_ADDRESS,
            payload([0xF1, 0x42, 0xF3], [1.0, 1.0, 1.0]),
            4,
        ),
        AdvertisementFrame::new(DEFAULT_INITIATOR_ADDRESS, good_payload(), 5),
    ];
    for frame in frames {
        tx.send(frame).await.unwrap();
    }
    drop(tx);

    let stats = receiver.await.unwrap();
    assert_eq!(
        stats,
        ReceiverStats {
            received: 6,
            ignored: 1,
            paused: 0,
            duplicates: 1,
            malformed: 1,
            partial: 1,
            recorded: 2,
        }
    );

    let history = session.history_snapshot().await;
    let counters: Vec<u64> = history.iter().map(|r| r.counter).collect();
    assert_eq!(counters, vec![5, 1]);
    assert_eq!(session.active_anchors().await, vec![0, 1, 2]);
    assert!(session.last_geo().await.is_some());
}

#[tokio::test]
async fn test_concurrent_senders_share_one_session() {
    let (tx, rx) = mpsc::channel(64);
    let session = SharedSession::default();
    let filter = InitiatorFilter::for_address(DEFAULT_INITIATOR_ADDRESS).unwrap();
    let receiver = tokio::spawn(run_receiver(rx, session.clone(), filter));

    let mut senders = Vec::new();
    for worker in 0..4u64 {
        let tx = tx.clone();
        senders.push(tokio::spawn(async move {
            for i in 0..10u64 {
                let counter = worker * 100 + i;
                let frame = AdvertisementFrame::new(DEFAULT_INITIATOR_ADDRESS, good_payload(), counter);
                tx.send(frame).await.unwrap();
            }
        }));
    }
    drop(tx);
    for sender in senders {
        sender.await.unwrap();
    }

    let stats = receiver.await.unwrap();
    assert_eq!(stats.received, 40);
    // 相邻两帧计数器相同时才算重复；不同任务的计数器互不相同
    assert_eq!(stats.recorded + stats.duplicates, 40);
    assert_eq!(session.history_snapshot().await.len(), stats.recorded);
}

#[tokio::test]
async fn test_paused_session_ignores_frames() {
    let session = SharedSession::default();
    session.pause().await;

    let frames = (1..=3)
        .map(|c| AdvertisementFrame::new(DEFAULT_INITIATOR_ADDRESS, good_payload(), c))
        .collect();
    let (rx, replay) = spawn_replay(frames, Duration::from_millis(1));
    let filter = InitiatorFilter::for_address(DEFAULT_INITIATOR_ADDRESS).unwrap();
    let stats = run_receiver(rx, session.clone(), filter).await;
    replay.await.unwrap();

    assert_eq!(stats.paused, 3);
    assert_eq!(stats.recorded, 0);
    assert!(session.history_snapshot().await.is_empty());

    session.resume().await;
    let frame = AdvertisementFrame::new(DEFAULT_INITIATOR_ADDRESS, good_payload(), 1);
    assert!(session.process(&frame).await.unwrap().is_recorded());

    session.reset().await;
    assert!(session.history_snapshot().await.is_empty());
    assert!(session.last_geo().await.is_none());
}

#[tokio::test]
async fn test_replay_preserves_order() {
    let frames: Vec<AdvertisementFrame> = (10..15)
        .map(|c| AdvertisementFrame::new(DEFAULT_INITIATOR_ADDRESS, good_payload(), c))
        .collect();
    let (rx, replay) = spawn_replay(frames, Duration::from_millis(1));

    let session = SharedSession::default();
    let filter = InitiatorFilter::for_address(DEFAULT_INITIATOR_ADDRESS).unwrap();
    let stats = run_receiver(rx, session.clone(), filter).await;
    replay.await.unwrap();

    assert_eq!(stats.recorded, 5);
    let counters: Vec<u64> = session.history_snapshot().await.iter().map(|r| r.counter).collect();
    assert_eq!(counters, vec![14, 13, 12, 11, 10]);
    let latest = session.with(|s| s.last_counter()).await;
    assert_eq!(latest, Some(14));
}

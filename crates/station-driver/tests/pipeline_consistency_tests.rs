//! 发布一致性测试
//!
//! 验证覆盖式发布的核心保证：
//! 1. 帧集合中的三个图像和原始深度总是来自同一个采集周期
//! 2. 反馈快照只在控制周期边界变化，读取方不会看到半更新的快照
//! 3. 慢消费者只错过中间值，不阻塞生产者

mod common;

use common::*;
use station_driver::{StationBuilder, VideoChannel};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

#[test]
fn test_frame_sets_are_never_mixed() {
    let station = StationBuilder::new()
        .pipeline_config(fast_config())
        .vision(Box::new(TaggedVision::new()))
        .arm(Box::new(ProbeArm::new(ArmProbe::default())))
        .state_machine(Box::new(EagerMachine::new()))
        .build()
        .unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let frames = station.frames();
            let stop = stop.clone();
            thread::spawn(move || {
                let mut checked = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    let Some(envelope) = frames.latest() else {
                        thread::yield_now();
                        continue;
                    };
                    let set = &envelope.value;
                    let tag = set.rgb().data()[0];
                    for channel in [VideoChannel::Rgb, VideoChannel::Depth, VideoChannel::Detect] {
                        assert!(
                            set.channel(channel).data().iter().all(|&b| b == tag),
                            "{channel:?} image mixes cycles"
                        );
                    }
                    assert_eq!(set.depth_raw().sample(0, 0), Some(u16::from(tag)));
                    checked += 1;
                }
                checked
            })
        })
        .collect();

    assert!(wait_until(Duration::from_secs(2), || {
        station.get_metrics().sensor_cycles >= 50
    }));
    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert!(station.shutdown().is_clean());
}

#[test]
fn test_feedback_changes_only_at_cycle_boundaries() {
    let station = StationBuilder::new()
        .pipeline_config(fast_config())
        .vision(Box::new(TaggedVision::new()))
        .arm(Box::new(ProbeArm::new(ArmProbe::default())))
        .state_machine(Box::new(EagerMachine::new()))
        .build()
        .unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ctx = station.context();
            let stop = stop.clone();
            thread::spawn(move || {
                let mut seen: HashMap<u64, f64> = HashMap::new();
                let mut last_cycle = 0;
                while !stop.load(Ordering::Relaxed) {
                    let feedback = ctx.feedback();
                    if feedback.control_cycle == 0 {
                        continue;
                    }
                    // 同一快照内所有字段来自同一次读取
                    let value = feedback.joint_angles[0];
                    assert!(feedback.joint_angles.iter().all(|&v| v == value));
                    assert!(feedback.end_effector_pose.iter().all(|&v| v == value));
                    // 每个控制周期恰好读取一次反馈
                    assert_eq!(value, feedback.control_cycle as f64);
                    // 同一周期的快照内容不变
                    let previous = *seen.entry(feedback.control_cycle).or_insert(value);
                    assert_eq!(previous, value);
                    assert!(feedback.control_cycle >= last_cycle);
                    last_cycle = feedback.control_cycle;
                }
                seen.len()
            })
        })
        .collect();

    assert!(wait_until(Duration::from_secs(2), || {
        station.feedback().control_cycle >= 100
    }));
    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        assert!(reader.join().unwrap() > 1);
    }
    assert!(station.shutdown().is_clean());
}

#[test]
fn test_slow_consumer_misses_frames_without_stalling_producer() {
    let station = StationBuilder::new()
        .pipeline_config(fast_config())
        .vision(Box::new(TaggedVision::new()))
        .arm(Box::new(ProbeArm::new(ArmProbe::default())))
        .state_machine(Box::new(EagerMachine::new()))
        .build()
        .unwrap();

    let mut reader = station.frame_reader();
    let mut received = 0u64;
    let mut last_seq = 0;
    for _ in 0..5 {
        thread::sleep(Duration::from_millis(20));
        if let Some(envelope) = reader.poll() {
            assert!(envelope.seq > last_seq);
            last_seq = envelope.seq;
            received += 1;
        }
    }

    let metrics = station.get_metrics();
    assert!(received <= 5);
    assert!(metrics.sensor_cycles > received);
    assert!(metrics.frames_overwritten > 0);
    assert!(station.shutdown().is_clean());
}

#[test]
fn test_telemetry_reflects_feedback_and_status() {
    let station = StationBuilder::new()
        .pipeline_config(fast_config())
        .vision(Box::new(TaggedVision::new()))
        .arm(Box::new(ProbeArm::new(ArmProbe::default())))
        .state_machine(Box::new(EagerMachine::new()))
        .build()
        .unwrap();

    station.panel().set_direct_control(true).unwrap();
    assert!(wait_until(Duration::from_secs(2), || {
        station
            .latest_telemetry()
            .is_some_and(|t| t.status == "State: manual" && t.control_cycle > 0)
    }));

    let telemetry = station.latest_telemetry().unwrap();
    let reading = telemetry.control_cycle as f64;
    // 弧度 → 度，肩关节 +90°
    assert!((telemetry.joints_deg[0] - reading.to_degrees()).abs() < 1e-6);
    assert!((telemetry.joints_deg[1] - (reading.to_degrees() + 90.0)).abs() < 1e-6);
    assert_eq!(telemetry.end_effector, [reading; 4]);
    assert!(station.shutdown().is_clean());
}

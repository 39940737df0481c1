mod common;

use common::*;
use eskf_dispatch::{
    Channel, DispatchConfig, FusionMask, OutputPose, PoseReceiver, Quat, Runner, Vec3,
    message::LandedState,
};
use std::time::Duration;
use tokio::time::sleep;

fn drain(poses: &mut PoseReceiver) -> Vec<OutputPose> {
    std::iter::from_fn(|| poses.try_recv().ok()).collect()
}

/// Read poses as they are published until the runner goes away.
async fn collect(mut poses: PoseReceiver) -> Vec<OutputPose> {
    let mut out = Vec::new();
    while let Some(pose) = poses.recv().await {
        out.push(pose);
    }
    out
}

#[tokio::test]
async fn test_mask_zero_has_no_optional_subscriptions() {
    let config = DispatchConfig::new(FusionMask::EMPTY, 100.0);
    let (runner, subs, _poses) = Runner::new(config, RecordingEstimator::new()).unwrap();

    assert!(subs.vision.is_none());
    assert!(subs.gps.is_none());
    assert!(subs.optical_flow.is_none());

    subs.imu.deliver(imu_at(100_000)).unwrap();
    subs.imu.deliver(imu_at(150_000)).unwrap();
    drop(subs);

    let finished = runner.run().await.unwrap();
    let est = finished.estimator;

    assert_eq!(est.configured, vec![FusionMask::EMPTY]);
    assert_eq!(est.measurements.len(), 1);
    assert_eq!(est.inertial()[0].dt, 0.05);
}

#[tokio::test]
async fn test_vision_only_wiring() {
    let config = DispatchConfig::new(FusionMask::VISION_POSITION, 100.0);
    let (runner, subs, _poses) = Runner::new(config, RecordingEstimator::new()).unwrap();

    assert!(subs.gps.is_none());
    assert!(subs.optical_flow.is_none());
    let vision = subs.vision.clone().expect("vision subscription");

    vision.deliver(vision_at(1_000_000)).unwrap();
    vision.deliver(vision_at(1_033_000)).unwrap();
    vision.deliver(vision_at(1_066_000)).unwrap();
    drop(vision);
    drop(subs);

    let finished = runner.run().await.unwrap();
    let est = finished.estimator;

    assert_eq!(est.configured, vec![FusionMask::VISION_POSITION]);
    let dts: Vec<f64> = est.vision().iter().map(|v| v.dt).collect();
    assert_eq!(dts, vec![0.033, 0.033]);
    assert!(est.gps().is_empty());
    assert!(est.optical_flow().is_empty());
    assert_eq!(finished.stats.channel(Channel::Vision).received, 3);
    assert_eq!(finished.stats.channel(Channel::Vision).forwarded, 2);
}

#[tokio::test]
async fn test_arrival_order_is_preserved_across_channels() {
    let config = DispatchConfig::new(FusionMask::ALL, 100.0);
    let (runner, subs, _poses) = Runner::new(config, RecordingEstimator::new()).unwrap();

    let gps = subs.gps.clone().unwrap();
    let flow = subs.optical_flow.clone().unwrap();

    subs.imu.deliver(imu_at(0)).unwrap();
    gps.deliver(gps_at(0)).unwrap();
    flow.deliver(flow_at(0)).unwrap();
    subs.ground_contact
        .deliver(landed_at(0, LandedState::OnGround))
        .unwrap();
    flow.deliver(flow_at(20_000)).unwrap();
    subs.imu.deliver(imu_at(5_000)).unwrap();
    gps.deliver(gps_at(100_000)).unwrap();
    drop((gps, flow, subs));

    let est = runner.run().await.unwrap().estimator;
    let order: Vec<Channel> = est.measurements.iter().map(|m| m.channel()).collect();
    assert_eq!(
        order,
        vec![
            Channel::GroundContact,
            Channel::OpticalFlow,
            Channel::Imu,
            Channel::Gps,
        ]
    );
}

#[tokio::test]
async fn test_subscription_cloned_across_threads() {
    let config = DispatchConfig::new(FusionMask::EMPTY, 100.0);
    let (runner, subs, _poses) = Runner::new(config, RecordingEstimator::new()).unwrap();
    let runner = tokio::spawn(runner.run());

    let imu = subs.imu.clone();
    drop(subs);
    std::thread::spawn(move || {
        for i in 0..=100u64 {
            imu.deliver(imu_at(i * 2_500)).unwrap();
        }
    })
    .join()
    .unwrap();

    let est = runner.await.unwrap().unwrap().estimator;
    let inertial = est.inertial();
    assert_eq!(inertial.len(), 100);
    assert!(inertial.iter().all(|s| s.dt == 0.0025));
}

#[tokio::test(start_paused = true)]
async fn test_publish_rate_ten_hz_for_one_second() {
    let config = DispatchConfig::new(FusionMask::EMPTY, 10.0);
    let (runner, _subs, poses) = Runner::new(config, RecordingEstimator::new()).unwrap();

    let (finished, poses) = tokio::join!(
        runner.run_until(sleep(Duration::from_millis(1_050))),
        collect(poses)
    );
    let finished = finished.unwrap();

    assert_eq!(poses.len(), 10);
    assert_eq!(finished.published, 10);
    assert_eq!(finished.dropped, 0);
}

#[tokio::test(start_paused = true)]
async fn test_pose_due_at_end_of_run_is_published() {
    // The 7th, 11th and 13th periods end just past one second.
    for rate in [7u64, 11, 13] {
        let config = DispatchConfig::new(FusionMask::EMPTY, rate as f64);
        let (runner, _subs, poses) = Runner::new(config, RecordingEstimator::new()).unwrap();

        let (finished, poses) = tokio::join!(
            runner.run_until(sleep(Duration::from_millis(1_001))),
            collect(poses)
        );
        let finished = finished.unwrap();

        assert_eq!(finished.published, rate, "rate {rate} Hz");
        assert_eq!(poses.len() as u64, rate, "rate {rate} Hz");
    }
}

#[tokio::test(start_paused = true)]
async fn test_unread_poses_do_not_accumulate() {
    let config = DispatchConfig::new(FusionMask::EMPTY, 100.0);
    let (runner, _subs, mut poses) = Runner::new(config, RecordingEstimator::new()).unwrap();

    let finished = runner
        .run_until(sleep(Duration::from_secs(600)))
        .await
        .unwrap();

    assert_eq!(finished.published, 60_000);
    assert_eq!(finished.dropped, 59_999);

    let queued = drain(&mut poses);
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].header.seq, 0);
}

#[tokio::test(start_paused = true)]
async fn test_published_poses_sequence_and_covariance() {
    let orientation = Quat::from_euler_angles(0.1, -0.2, 0.3);
    let position = Vec3::new(4.0, -5.0, 6.0);
    let estimator = RecordingEstimator::scripted(orientation, position);

    let config = DispatchConfig::new(FusionMask::EMPTY, 50.0).with_frame_id("/odom");
    let (runner, _subs, poses) = Runner::new(config, estimator).unwrap();

    let (finished, poses) = tokio::join!(
        runner.run_until(sleep(Duration::from_millis(250))),
        collect(poses)
    );
    finished.unwrap();

    assert_eq!(poses.len(), 12);
    for (i, pose) in poses.iter().enumerate() {
        assert_eq!(pose.header.seq, i as u64);
        assert_eq!(pose.header.frame_id, "/odom");
        assert_eq!(pose.orientation, orientation);
        assert_eq!(pose.position, position);
        assert_eq!(pose.covariance.len(), 36);
        assert!(pose.covariance.iter().all(|&c| c == 0.0));
    }
}

#[tokio::test(start_paused = true)]
async fn test_publishes_initial_state_before_any_measurement() {
    let config = DispatchConfig::new(FusionMask::VISION, 20.0);
    let (runner, _subs, poses) = Runner::new(config, RecordingEstimator::new()).unwrap();

    let (finished, poses) = tokio::join!(
        runner.run_until(sleep(Duration::from_millis(120))),
        collect(poses)
    );

    assert!(finished.unwrap().estimator.measurements.is_empty());
    assert_eq!(poses.len(), 2);
    assert_eq!(poses[0].orientation, Quat::identity());
    assert_eq!(poses[0].position, Vec3::zeros());
}

#[tokio::test(start_paused = true)]
async fn test_publication_continues_after_inputs_close() {
    let config = DispatchConfig::new(FusionMask::EMPTY, 10.0);
    let (runner, subs, poses) = Runner::new(config, RecordingEstimator::new()).unwrap();

    subs.imu.deliver(imu_at(0)).unwrap();
    subs.imu.deliver(imu_at(10_000)).unwrap();
    drop(subs);

    let (finished, poses) = tokio::join!(
        runner.run_until(sleep(Duration::from_millis(550))),
        collect(poses)
    );

    assert_eq!(finished.unwrap().estimator.inertial().len(), 1);
    assert_eq!(poses.len(), 5);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config = DispatchConfig::new(FusionMask::EMPTY, 0.0);
    assert!(Runner::new(config, RecordingEstimator::new()).is_err());
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{debug, info};

use crate::angles::{elbows, head, AngleAggregator, AngleFilter, AngleResult, AngleSnapshot, JointField, Side};
use crate::config::{Config, SenderConfig, VisionConfig};
use crate::pose::{KeypointSource, LandmarkFrame};
use crate::sender::{ConnectPoll, SnapshotSender};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames: u64,
    pub sent: u64,
    pub dropped: u64,
}

/// One vision pipeline run: geometry -> filter -> aggregator, frame by frame.
pub struct VisionPipeline {
    vision: VisionConfig,
    filter: AngleFilter,
    aggregator: AngleAggregator,
}

impl VisionPipeline {
    pub fn new(vision: VisionConfig, filter: AngleFilter) -> Self {
        Self {
            vision,
            filter,
            aggregator: AngleAggregator::with_resting_pose(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.vision.clone(), AngleFilter::from_config(&config.filter))
    }

    fn record(&mut self, field: JointField, side: Side, raw: Option<AngleResult>) {
        let smoothed = raw.map(|angle| AngleResult::from_degrees(self.filter.smooth(angle.degree, side)));
        self.aggregator.update(field, smoothed);
    }

    /// Fold one frame into the running snapshot.
    pub fn process(&mut self, frame: &LandmarkFrame) -> &AngleSnapshot {
        let z_scale = self.vision.z_scale;
        let threshold = self.vision.visibility_threshold;

        if self.vision.head {
            let reading = head::estimate(frame, z_scale, threshold);
            self.record(JointField::HeadPitch, Side::Pitch, reading.pitch);
            self.record(JointField::HeadYaw, Side::Yaw, reading.yaw);
            self.record(JointField::HeadRoll, Side::Roll, reading.roll);
        }

        if self.vision.elbows {
            for side in [Side::Left, Side::Right] {
                if let Some(field) = elbows::snapshot_field(side) {
                    let raw = elbows::elbow_roll(frame, side, z_scale, threshold);
                    self.record(field, side, raw);
                }
            }
        }

        self.aggregator.snapshot()
    }

    pub fn snapshot(&self) -> &AngleSnapshot {
        self.aggregator.snapshot()
    }

    /// Run until `stop` is set or the source runs dry, pacing to the target
    /// frame rate. Reconnects happen on a helper thread so an unreachable
    /// robot costs dropped frames, never frame time. The connection is
    /// closed on every exit path.
    pub fn run<S: KeypointSource>(
        &mut self,
        source: &mut S,
        sender: &mut SnapshotSender,
        sender_config: &SenderConfig,
        stop: &AtomicBool,
    ) -> Result<RunStats> {
        let result = self.run_loop(source, sender, sender_config, stop);
        sender.disconnect();
        result
    }

    fn run_loop<S: KeypointSource>(
        &mut self,
        source: &mut S,
        sender: &mut SnapshotSender,
        sender_config: &SenderConfig,
        stop: &AtomicBool,
    ) -> Result<RunStats> {
        let frame_budget = Duration::from_secs_f64(1.0 / self.vision.target_fps.max(1.0));
        let reconnect_interval = Duration::from_millis(sender_config.reconnect_interval_ms);
        let mut last_attempt: Option<Instant> = None;
        let mut stats = RunStats::default();

        while !stop.load(Ordering::Relaxed) {
            let frame_start = Instant::now();

            let Some(frame) = source.next_frame()? else {
                info!("landmark source finished");
                break;
            };
            stats.frames += 1;
            self.process(&frame);

            // interval counts from when the last attempt gave up
            if sender.poll_connect() == ConnectPoll::Failed {
                last_attempt = Some(Instant::now());
            }
            if !sender.is_connected()
                && !sender.is_connecting()
                && last_attempt.map_or(true, |t| t.elapsed() >= reconnect_interval)
            {
                sender.connect_in_background(&sender_config.addr);
            }

            if sender.send(self.aggregator.snapshot()) {
                stats.sent += 1;
            } else {
                stats.dropped += 1;
            }

            if stats.frames % 300 == 0 {
                debug!("frames={} sent={} dropped={}", stats.frames, stats.sent, stats.dropped);
            }

            let elapsed = frame_start.elapsed();
            if elapsed < frame_budget {
                std::thread::sleep(frame_budget - elapsed);
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{BodyLandmark, Landmark};
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    fn arm_frame(left_wrist: Landmark) -> LandmarkFrame {
        let mut body = vec![Landmark::new(0.0, 0.0, 0.0, 0.0); BodyLandmark::COUNT];
        body[BodyLandmark::LeftShoulder as usize] = Landmark::new(0.5, 0.2, 0.0, 0.9);
        body[BodyLandmark::LeftElbow as usize] = Landmark::new(0.5, 0.5, 0.0, 0.9);
        body[BodyLandmark::LeftWrist as usize] = left_wrist;
        LandmarkFrame {
            width: 100,
            height: 100,
            body: Some(body),
            face: None,
        }
    }

    fn unfiltered() -> VisionPipeline {
        VisionPipeline::new(VisionConfig::default(), AngleFilter::new(false, 5, 5.0, 30.0))
    }

    struct VecSource(Vec<LandmarkFrame>);

    impl KeypointSource for VecSource {
        fn next_frame(&mut self) -> Result<Option<LandmarkFrame>> {
            if self.0.is_empty() {
                Ok(None)
            } else {
                Ok(Some(self.0.remove(0)))
            }
        }
    }

    #[test]
    fn test_process_updates_visible_elbow() {
        let mut pipeline = unfiltered();
        let snapshot = pipeline.process(&arm_frame(Landmark::new(0.8, 0.5, 0.0, 0.9)));
        let left = snapshot.get(JointField::LeftElbowRoll).unwrap();
        assert!((left.degree - 90.0).abs() < 1e-6);
        // right arm invisible: keeps the resting value
        assert_eq!(snapshot.get(JointField::RightElbowRoll).unwrap().degree, 180.0);
    }

    #[test]
    fn test_hidden_joint_retains_last_value() {
        let mut pipeline = unfiltered();
        pipeline.process(&arm_frame(Landmark::new(0.8, 0.5, 0.0, 0.9)));
        let snapshot = pipeline.process(&arm_frame(Landmark::new(0.5, 0.8, 0.0, 0.1)));
        let left = snapshot.get(JointField::LeftElbowRoll).unwrap();
        assert!((left.degree - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_face_leaves_head_empty() {
        let mut pipeline = unfiltered();
        let snapshot = pipeline.process(&LandmarkFrame::default());
        assert!(snapshot.get(JointField::HeadPitch).is_none());
        assert!(snapshot.get(JointField::HeadYaw).is_none());
    }

    #[test]
    fn test_filter_is_applied_per_side() {
        let mut pipeline = VisionPipeline::new(VisionConfig::default(), AngleFilter::new(true, 5, 5.0, 30.0));
        // 90 degrees, then 108 degrees; the weighted average is 102
        pipeline.process(&arm_frame(Landmark::new(0.8, 0.5, 0.0, 0.9)));
        let snapshot = pipeline.process(&arm_frame(Landmark::new(0.8, 0.5975, 0.0, 0.9)));
        let left = snapshot.get(JointField::LeftElbowRoll).unwrap();
        assert!(left.degree < 105.0 && left.degree > 90.0);
        assert!((left.radian - left.degree.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn test_disabled_groups_are_untouched() {
        let mut vision = VisionConfig::default();
        vision.elbows = false;
        let mut pipeline = VisionPipeline::new(vision, AngleFilter::new(false, 5, 5.0, 30.0));
        let snapshot = pipeline.process(&arm_frame(Landmark::new(0.8, 0.5, 0.0, 0.9)));
        assert_eq!(snapshot.get(JointField::LeftElbowRoll).unwrap().degree, 180.0);
    }

    #[test]
    fn test_run_without_receiver_drops_frames() {
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let sender_config = SenderConfig {
            addr: addr.to_string(),
            connect_timeout_ms: 100,
            reconnect_interval_ms: 10_000,
        };
        let mut vision = VisionConfig::default();
        vision.target_fps = 1000.0;
        let mut pipeline = VisionPipeline::new(vision, AngleFilter::new(false, 5, 5.0, 30.0));
        let mut source = VecSource(vec![LandmarkFrame::default(); 3]);
        let mut sender = SnapshotSender::from_config(&sender_config);

        let stats = pipeline
            .run(&mut source, &mut sender, &sender_config, &AtomicBool::new(false))
            .unwrap();
        assert_eq!(stats, RunStats { frames: 3, sent: 0, dropped: 3 });
    }

    #[test]
    fn test_run_streams_to_receiver() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let sender_config = SenderConfig {
            addr: listener.local_addr().unwrap().to_string(),
            connect_timeout_ms: 2000,
            reconnect_interval_ms: 0,
        };
        let reader = std::thread::spawn(move || {
            let (peer, _) = listener.accept().unwrap();
            BufReader::new(peer).lines().count()
        });

        let mut vision = VisionConfig::default();
        vision.target_fps = 1000.0;
        let mut pipeline = VisionPipeline::new(vision, AngleFilter::new(false, 5, 5.0, 30.0));
        let mut source = VecSource(vec![arm_frame(Landmark::new(0.8, 0.5, 0.0, 0.9)); 4]);
        let mut sender = SnapshotSender::from_config(&sender_config);
        assert!(sender.connect(&sender_config.addr));

        let stats = pipeline
            .run(&mut source, &mut sender, &sender_config, &AtomicBool::new(false))
            .unwrap();
        assert_eq!(stats.sent, 4);
        assert!(!sender.is_connected());
        assert_eq!(reader.join().unwrap(), 4);
    }

    #[test]
    fn test_stop_flag_exits_before_reading() {
        let sender_config = SenderConfig::default();
        let mut pipeline = unfiltered();
        let mut source = VecSource(vec![LandmarkFrame::default()]);
        let mut sender = SnapshotSender::from_config(&sender_config);
        let stats = pipeline
            .run(&mut source, &mut sender, &sender_config, &AtomicBool::new(true))
            .unwrap();
        assert_eq!(stats.frames, 0);
        assert_eq!(source.0.len(), 1);
    }

    #[test]
    fn test_unreachable_robot_does_not_slow_the_loop() {
        // nothing answers here: connects either hang until the timeout or fail at once
        let sender_config = SenderConfig {
            addr: "[100::1]:65432".to_string(),
            connect_timeout_ms: 2000,
            reconnect_interval_ms: 1000,
        };
        let mut vision = VisionConfig::default();
        vision.target_fps = 30.0;
        let mut pipeline = VisionPipeline::new(vision, AngleFilter::new(false, 5, 5.0, 30.0));
        let mut source = VecSource(vec![LandmarkFrame::default(); 30]);
        let mut sender = SnapshotSender::from_config(&sender_config);
        sender.connect_in_background(&sender_config.addr);

        let start = Instant::now();
        let stats = pipeline
            .run(&mut source, &mut sender, &sender_config, &AtomicBool::new(false))
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(stats, RunStats { frames: 30, sent: 0, dropped: 30 });
        assert!(elapsed < Duration::from_millis(1900), "took {:?}", elapsed);
        assert!(!sender.is_connecting());
    }
}

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::config::FilterConfig;

/// Independently filtered axis. Each one owns its own history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
    Pitch,
    Yaw,
    Roll,
}

/// Weighted moving average with a jump policy.
///
/// Keeps the last `frame_window` raw degrees per side and weights them
/// linearly from 1.0 (oldest) to 2.0 (newest). The average replaces the raw
/// value only when the two differ by more than `deviation_floor` and less
/// than `difference_ceiling`; small changes and deliberate large motions pass
/// through untouched.
pub struct AngleFilter {
    enabled: bool,
    frame_window: usize,
    deviation_floor: f64,
    difference_ceiling: f64,
    history: HashMap<Side, VecDeque<f64>>,
}

impl AngleFilter {
    pub fn new(enabled: bool, frame_window: usize, deviation_floor: f64, difference_ceiling: f64) -> Self {
        Self {
            enabled,
            frame_window: frame_window.max(1),
            deviation_floor,
            difference_ceiling,
            history: HashMap::new(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(
            config.enabled,
            config.frame_window,
            config.deviation_floor,
            config.difference_ceiling,
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn smooth(&mut self, raw: f64, side: Side) -> f64 {
        if !self.enabled {
            return raw;
        }

        let frames = self.history.entry(side).or_default();
        frames.push_back(raw);
        while frames.len() > self.frame_window {
            frames.pop_front();
        }

        let average = weighted_average(frames);
        let d = (raw - average).abs();
        if d < self.difference_ceiling && d > self.deviation_floor {
            average
        } else {
            raw
        }
    }

    /// Buffered raw values for one side, oldest first
    pub fn history(&self, side: Side) -> Vec<f64> {
        self.history
            .get(&side)
            .map(|frames| frames.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

fn weighted_average(frames: &VecDeque<f64>) -> f64 {
    let n = frames.len();
    if n == 1 {
        return frames[0];
    }

    let step = 1.0 / (n - 1) as f64;
    let (sum, weight_sum) = frames
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sum, weight_sum), (i, value)| {
            let w = 1.0 + i as f64 * step;
            (sum + w * value, weight_sum + w)
        });
    sum / weight_sum
}

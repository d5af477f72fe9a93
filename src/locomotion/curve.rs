use bevy_math::prelude::*;
use bevy_reflect::prelude::*;

use super::error::ConfigError;

/// A monotonic time → multiplier mapping made of linearly interpolated keyframes.
///
/// `x` is time in seconds of smoothing, `y` is the interpolation factor between
/// the speed a pass started at and the speed it is heading for. The time of the
/// last keyframe is the length of a full pass.
#[derive(Clone, Reflect, Debug, PartialEq)]
pub struct SpeedCurve {
    keys: Vec<Vec2>,
}

impl SpeedCurve {
    /// Keys are taken as-is. Use [`SpeedCurve::validate`] before relying on them.
    pub fn new(keys: impl Into<Vec<Vec2>>) -> Self {
        Self { keys: keys.into() }
    }

    pub fn linear(duration: f32) -> Self {
        Self::new([Vec2::ZERO, vec2(duration, 1.0)])
    }

    pub fn keys(&self) -> &[Vec2] {
        &self.keys
    }

    /// Time of the last keyframe.
    pub fn duration(&self) -> f32 {
        self.keys.last().map(|key| key.x).unwrap_or_default()
    }

    /// Samples the curve, clamping outside the keyed range.
    pub fn sample(&self, time: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 1.0;
        };
        if time <= first.x {
            return first.y;
        }
        if time >= last.x {
            return last.y;
        }
        // `time` is strictly inside the keyed range, so some window brackets it
        self.keys
            .windows(2)
            .find(|pair| time <= pair[1].x)
            .map(|pair| {
                let span = pair[1].x - pair[0].x;
                let t = (time - pair[0].x) / span;
                pair[0].y + (pair[1].y - pair[0].y) * t
            })
            .unwrap_or(last.y)
    }

    pub fn validate(&self, curve: &'static str) -> Result<(), ConfigError> {
        if self.keys.len() < 2 {
            return Err(ConfigError::TooFewKeyframes {
                curve,
                count: self.keys.len(),
            });
        }
        if !self.keys.iter().all(|key| key.is_finite()) {
            return Err(ConfigError::NonFinite { field: curve });
        }
        for (index, pair) in self.keys.windows(2).enumerate() {
            if pair[1].x <= pair[0].x {
                return Err(ConfigError::NonIncreasingTime {
                    curve,
                    index: index + 1,
                });
            }
            if pair[1].y < pair[0].y {
                return Err(ConfigError::DecreasingMultiplier {
                    curve,
                    index: index + 1,
                });
            }
        }
        if self.keys[0].x < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: curve,
                value: self.keys[0].x,
            });
        }
        Ok(())
    }
}

impl Default for SpeedCurve {
    /// Slow start, fast middle, gentle landing over one second.
    fn default() -> Self {
        Self::new([
            Vec2::ZERO,
            vec2(0.25, 0.15),
            vec2(0.75, 0.85),
            vec2(1.0, 1.0),
        ])
    }
}

//! Speed envelopes and the curve-driven smoothing between them.

use super::{LocomotionConfig, MovementMode, SpeedCurve};

/// Slack allowed when deciding that a decaying slide has bottomed out.
const SLIDE_FLOOR_EPSILON: f32 = 1e-4;

/// Target speed of every mode that has one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedProfile {
    pub walk: f32,
    pub sprint: f32,
    pub crouch: f32,
    pub slide: f32,
}

impl SpeedProfile {
    pub fn from_config(cfg: &LocomotionConfig) -> Self {
        Self {
            walk: cfg.walk_speed,
            sprint: cfg.sprint_speed,
            crouch: cfg.crouch_speed,
            slide: cfg.slide_speed,
        }
    }

    /// `None` for modes that keep whatever desired speed they inherited.
    pub fn target(&self, mode: MovementMode) -> Option<f32> {
        match mode {
            MovementMode::Walking => Some(self.walk),
            MovementMode::Sprinting => Some(self.sprint),
            MovementMode::Crouching => Some(self.crouch),
            MovementMode::Sliding => Some(self.slide),
            MovementMode::Airborne | MovementMode::WallRunning => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PassKind {
    /// Toward the desired speed along `speed_curve`.
    Ease,
    /// A slide bleeding off toward the slide floor along `slide_curve`.
    SlideDecay,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct SmoothingPass {
    kind: PassKind,
    start: f32,
    target: f32,
    elapsed: f32,
}

/// Everything about the tick the regulator cares about besides `dt` and the desired speed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedContext {
    pub mode: MovementMode,
    /// Degrees, only present on a valid slope.
    pub slope_angle: Option<f32>,
    pub downhill: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedSample {
    pub current: f32,
    /// A decaying slide reached the slide floor and should end.
    pub slide_exhausted: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct CachedCall {
    tick: u64,
    dt: f32,
    desired: f32,
    sample: SpeedSample,
}

#[derive(Clone, Debug)]
pub struct SpeedRegulator {
    profile: SpeedProfile,
    current: f32,
    desired: f32,
    last_desired: f32,
    pass: Option<SmoothingPass>,
    cached: Option<CachedCall>,
}

impl SpeedRegulator {
    pub fn new(profile: SpeedProfile) -> Self {
        Self {
            profile,
            current: 0.0,
            desired: 0.0,
            last_desired: 0.0,
            pass: None,
            cached: None,
        }
    }

    pub fn profile(&self) -> &SpeedProfile {
        &self.profile
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn desired(&self) -> f32 {
        self.desired
    }

    pub fn last_desired(&self) -> f32 {
        self.last_desired
    }

    pub fn is_smoothing(&self) -> bool {
        self.pass.is_some()
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.profile);
    }

    /// Advances smoothing by one tick and returns the speed to apply.
    ///
    /// Calling this again for the same `tick` with the same `dt` and `desired`
    /// returns the first result without advancing anything.
    pub fn tick(
        &mut self,
        tick: u64,
        dt: f32,
        desired: f32,
        ctx: SpeedContext,
        cfg: &LocomotionConfig,
    ) -> SpeedSample {
        if let Some(cached) = self.cached
            && cached.tick == tick
            && cached.dt == dt
            && cached.desired == desired
        {
            return cached.sample;
        }

        let dt = dt.max(0.0);
        let sliding = ctx.mode == MovementMode::Sliding;
        let kind = if sliding && !ctx.downhill {
            PassKind::SlideDecay
        } else {
            PassKind::Ease
        };
        let target = match kind {
            PassKind::SlideDecay => cfg.slide_floor().min(desired),
            PassKind::Ease => desired,
        };
        let active_kind = self.pass.map(|pass| pass.kind);

        if kind == PassKind::SlideDecay {
            if active_kind != Some(PassKind::SlideDecay) {
                self.begin(kind, target);
            }
        } else if (desired - self.last_desired).abs() > cfg.speed_change_threshold
            && self.current != 0.0
        {
            self.begin(kind, target);
        } else if active_kind == Some(PassKind::SlideDecay) {
            self.begin(kind, target);
        }

        let mut slide_exhausted = false;
        match self.pass.as_mut() {
            Some(pass) => {
                // the pass chases the live desired speed
                pass.target = target;
                let rate = if sliding {
                    cfg.slide_smoothing_rate
                } else if let Some(angle) = ctx.slope_angle {
                    cfg.speed_increase_multiplier
                        * cfg.slope_increase_multiplier
                        * (1.0 + angle / 90.0)
                } else {
                    cfg.speed_increase_multiplier
                };
                pass.elapsed += dt * rate;

                let curve = curve_for(pass.kind, cfg);
                if pass.elapsed >= curve.duration() {
                    self.current = pass.target;
                    self.pass = None;
                } else {
                    let t = curve.sample(pass.elapsed).clamp(0.0, 1.0);
                    self.current = pass.start + (pass.target - pass.start) * t;
                }
                if kind == PassKind::SlideDecay
                    && self.current <= cfg.slide_floor() + SLIDE_FLOOR_EPSILON
                {
                    slide_exhausted = true;
                    self.pass = None;
                }
            }
            None => self.current = target,
        }

        // the envelope never lets the applied speed run ahead of the mode's target
        self.current = self.current.min(desired).max(0.0);
        self.desired = desired;
        self.last_desired = desired;

        let sample = SpeedSample {
            current: self.current,
            slide_exhausted,
        };
        self.cached = Some(CachedCall {
            tick,
            dt,
            desired,
            sample,
        });
        sample
    }

    /// Starting a pass discards any pass already in flight.
    fn begin(&mut self, kind: PassKind, target: f32) {
        self.pass = Some(SmoothingPass {
            kind,
            start: self.current,
            target,
            elapsed: 0.0,
        });
    }
}

fn curve_for(kind: PassKind, cfg: &LocomotionConfig) -> &SpeedCurve {
    match kind {
        PassKind::Ease => &cfg.speed_curve,
        PassKind::SlideDecay => &cfg.slide_curve,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn flat(mode: MovementMode) -> SpeedContext {
        SpeedContext {
            mode,
            slope_angle: None,
            downhill: false,
        }
    }

    struct Harness {
        cfg: LocomotionConfig,
        regulator: SpeedRegulator,
        tick: u64,
    }

    impl Harness {
        fn new(cfg: LocomotionConfig) -> Self {
            let regulator = SpeedRegulator::new(SpeedProfile::from_config(&cfg));
            Self {
                cfg,
                regulator,
                tick: 0,
            }
        }

        fn step(&mut self, dt: f32, desired: f32, ctx: SpeedContext) -> SpeedSample {
            self.tick += 1;
            self.regulator.tick(self.tick, dt, desired, ctx, &self.cfg)
        }

        /// Real time needed for one full ease pass on flat ground.
        fn ease_time(&self) -> f32 {
            self.cfg.speed_curve.duration() / self.cfg.speed_increase_multiplier
        }
    }

    #[test]
    fn first_tick_snaps_from_rest() {
        let mut h = Harness::new(LocomotionConfig::default());
        let sample = h.step(DT, 7.0, flat(MovementMode::Walking));
        assert_eq!(sample.current, 7.0);
        assert!(!h.regulator.is_smoothing());
    }

    #[test]
    fn small_changes_snap() {
        let mut h = Harness::new(LocomotionConfig::default());
        h.step(DT, 7.0, flat(MovementMode::Walking));
        let sample = h.step(DT, 3.5, flat(MovementMode::Crouching));
        assert_eq!(sample.current, 3.5);
        assert!(!h.regulator.is_smoothing());
    }

    #[test]
    fn walk_to_sprint_reaches_sprint_after_full_curve() {
        let mut h = Harness::new(LocomotionConfig {
            walk_speed: 7.0,
            sprint_speed: 12.0,
            ..Default::default()
        });
        h.step(DT, 7.0, flat(MovementMode::Walking));

        let first = h.step(DT, 12.0, flat(MovementMode::Sprinting));
        assert!(first.current > 7.0 && first.current < 12.0);
        assert!(h.regulator.is_smoothing());

        let ticks = (h.ease_time() / DT).ceil() as usize;
        let mut previous = first.current;
        for _ in 0..ticks {
            let sample = h.step(DT, 12.0, flat(MovementMode::Sprinting));
            assert!(sample.current >= previous);
            assert!(sample.current <= 12.0);
            previous = sample.current;
        }
        assert_eq!(h.regulator.current(), 12.0);
        assert!(!h.regulator.is_smoothing());
    }

    #[test]
    fn slopes_shorten_the_pass() {
        let cfg = LocomotionConfig::default();
        let mut flat_h = Harness::new(cfg.clone());
        let mut slope_h = Harness::new(cfg);
        let on_slope = SpeedContext {
            mode: MovementMode::Sprinting,
            slope_angle: Some(30.0),
            downhill: false,
        };
        flat_h.step(DT, 7.0, flat(MovementMode::Walking));
        slope_h.step(DT, 7.0, flat(MovementMode::Walking));
        let on_flat = flat_h.step(DT, 12.0, flat(MovementMode::Sprinting));
        let climbing = slope_h.step(DT, 12.0, on_slope);
        assert!(climbing.current > on_flat.current);
    }

    #[test]
    fn reverting_mid_pass_settles_on_the_starting_speed() {
        let mut h = Harness::new(LocomotionConfig::default());
        h.step(DT, 7.0, flat(MovementMode::Walking));
        h.step(DT, 12.0, flat(MovementMode::Sprinting));
        h.step(DT, 12.0, flat(MovementMode::Sprinting));

        for _ in 0..240 {
            h.step(DT, 7.0, flat(MovementMode::Walking));
        }
        assert_eq!(h.regulator.current(), 7.0);
        assert!(!h.regulator.is_smoothing());
    }

    #[test]
    fn never_exceeds_desired() {
        let mut h = Harness::new(LocomotionConfig::default());
        h.step(DT, 12.0, flat(MovementMode::Sprinting));
        let sample = h.step(DT, 3.5, flat(MovementMode::Crouching));
        assert!(sample.current <= 3.5 + f32::EPSILON);
    }

    #[test]
    fn zero_and_negative_dt_do_not_advance() {
        let mut h = Harness::new(LocomotionConfig::default());
        h.step(DT, 7.0, flat(MovementMode::Walking));
        h.step(DT, 12.0, flat(MovementMode::Sprinting));
        let before = h.regulator.current();
        let zero = h.step(0.0, 12.0, flat(MovementMode::Sprinting));
        let negative = h.step(-1.0, 12.0, flat(MovementMode::Sprinting));
        assert_eq!(zero.current, before);
        assert_eq!(negative.current, before);
        assert!(h.regulator.is_smoothing());

        // and the pass still finishes afterwards
        for _ in 0..240 {
            h.step(DT, 12.0, flat(MovementMode::Sprinting));
        }
        assert_eq!(h.regulator.current(), 12.0);
    }

    #[test]
    fn repeated_calls_within_a_tick_are_idempotent() {
        let cfg = LocomotionConfig::default();
        let mut regulator = SpeedRegulator::new(SpeedProfile::from_config(&cfg));
        regulator.tick(1, DT, 7.0, flat(MovementMode::Walking), &cfg);
        let once = regulator.tick(2, DT, 12.0, flat(MovementMode::Sprinting), &cfg);
        let twice = regulator.tick(2, DT, 12.0, flat(MovementMode::Sprinting), &cfg);
        assert_eq!(once, twice);
        let next = regulator.tick(3, DT, 12.0, flat(MovementMode::Sprinting), &cfg);
        assert!(next.current > once.current);
    }

    #[test]
    fn flat_slide_decays_to_the_minimum_and_reports_exhaustion() {
        let mut h = Harness::new(LocomotionConfig {
            minimum_slide_speed: 4.0,
            ..Default::default()
        });
        h.step(DT, 12.0, flat(MovementMode::Sprinting));

        let slide_speed = h.cfg.slide_speed;
        let mut exhausted_at = None;
        for tick in 0..600 {
            let sample = h.step(DT, slide_speed, flat(MovementMode::Sliding));
            assert!(sample.current <= 12.0);
            if sample.slide_exhausted {
                exhausted_at = Some(tick);
                assert!((sample.current - 4.0).abs() < 1e-3);
                break;
            }
        }
        let ticks = exhausted_at.expect("slide should bottom out");
        let expected = h.cfg.slide_curve.duration() / h.cfg.slide_smoothing_rate / DT;
        assert!((ticks as f32 - expected).abs() <= 2.0);
    }

    #[test]
    fn slide_never_decays_below_crouch_speed() {
        let mut h = Harness::new(LocomotionConfig {
            minimum_slide_speed: 1.0,
            crouch_speed: 3.5,
            ..Default::default()
        });
        h.step(DT, 12.0, flat(MovementMode::Sprinting));

        let slide_speed = h.cfg.slide_speed;
        let mut last = None;
        for _ in 0..600 {
            let sample = h.step(DT, slide_speed, flat(MovementMode::Sliding));
            assert!(sample.current >= 3.5 - 1e-3);
            if sample.slide_exhausted {
                last = Some(sample);
                break;
            }
        }
        let last = last.expect("slide should bottom out");
        assert!((last.current - 3.5).abs() < 1e-3);
    }

    #[test]
    fn downhill_slide_keeps_slide_speed() {
        let mut h = Harness::new(LocomotionConfig::default());
        h.step(DT, 12.0, flat(MovementMode::Sprinting));
        let downhill = SpeedContext {
            mode: MovementMode::Sliding,
            slope_angle: Some(20.0),
            downhill: true,
        };
        let slide_speed = h.cfg.slide_speed;
        for _ in 0..600 {
            let sample = h.step(DT, slide_speed, downhill);
            assert!(!sample.slide_exhausted);
        }
        assert_eq!(h.regulator.current(), slide_speed);
    }
}

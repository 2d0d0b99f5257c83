//! Slow motion.
//!
//! [`TimeDilation`] keeps a desired time scale and smooths the applied scale
//! toward it. Both the smoothing and the reset countdown run on real time, so
//! a slowed world does not also slow its own recovery.

use bevy::prelude::*;

use crate::config::{DilationConfig, MotorConfig};
use crate::util::smooth_damp;
use crate::GameState;

/// Anything that accepts a global time scale.
pub trait TimeScaleSink {
    fn set_time_scale(&mut self, scale: f32);
}

impl TimeScaleSink for Time<Virtual> {
    fn set_time_scale(&mut self, scale: f32) {
        self.set_relative_speed(scale);
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct SlowmoRequest {
    pub scale: f32,
    /// Real seconds until the scale returns to normal.
    pub duration: f32,
}

#[derive(Resource, Reflect, Debug, Clone, PartialEq)]
#[reflect(Resource)]
pub struct TimeDilation {
    enabled: bool,
    smooth_time: f32,
    desired: f32,
    scale: f32,
    velocity: f32,
    reset_in: Option<f32>,
}

impl Default for TimeDilation {
    fn default() -> Self {
        Self::new(&DilationConfig::default())
    }
}

impl TimeDilation {
    pub fn new(config: &DilationConfig) -> Self {
        Self {
            enabled: config.enabled,
            smooth_time: config.smooth_time,
            desired: 1.0,
            scale: 1.0,
            velocity: 0.0,
            reset_in: None,
        }
    }

    /// Slows time to `scale` for `duration` real seconds, replacing any slow
    /// motion already in progress. Returns `false` if the request was
    /// ignored.
    pub fn request_slowmo(&mut self, scale: f32, duration: f32) -> bool {
        if !self.enabled {
            return false;
        }
        if !(scale.is_finite() && scale > 0.0 && duration.is_finite() && duration >= 0.0) {
            return false;
        }
        self.desired = scale;
        self.reset_in = Some(duration);
        true
    }

    /// Advances the countdown and the smoothing by `real_dt`. Returns the
    /// scale to apply.
    pub fn update(&mut self, real_dt: f32) -> f32 {
        if let Some(remaining) = self.reset_in {
            let remaining = remaining - real_dt;
            if remaining <= 0.0 {
                self.reset_in = None;
                self.desired = 1.0;
            } else {
                self.reset_in = Some(remaining);
            }
        }
        self.scale = smooth_damp(
            self.scale,
            self.desired,
            &mut self.velocity,
            self.smooth_time,
            real_dt,
        );
        self.scale
    }

    /// Returns to normal speed, dropping any pending reset.
    pub fn reset(&mut self) {
        self.desired = 1.0;
        self.reset_in = None;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn desired(&self) -> f32 {
        self.desired
    }

    /// Real seconds left before the scale is reset.
    pub fn pending_reset(&self) -> Option<f32> {
        self.reset_in
    }

    /// Strength of slow-motion presentation effects, in `[0, 0.7]`.
    pub fn intensity(&self) -> f32 {
        ((1.0 - self.scale) * 2.0).clamp(0.0, 0.7)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling also drops any slow motion in progress.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.reset();
        }
    }

    /// Takes over the options of a (re)loaded config.
    pub fn apply_config(&mut self, config: &DilationConfig) {
        self.smooth_time = config.smooth_time;
        self.set_enabled(config.enabled);
    }
}

pub struct SlowmoPlugin;

impl Plugin for SlowmoPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SlowmoRequest>()
            .register_type::<TimeDilation>()
            .add_systems(Startup, init_time_dilation)
            .add_systems(
                Update,
                (sync_dilation_config, apply_slowmo_requests, update_time_dilation)
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

fn init_time_dilation(mut commands: Commands, config: Option<Res<MotorConfig>>) {
    let dilation = config
        .map(|config| TimeDilation::new(&config.dilation))
        .unwrap_or_default();
    commands.insert_resource(dilation);
}

fn sync_dilation_config(config: Option<Res<MotorConfig>>, mut dilation: ResMut<TimeDilation>) {
    let Some(config) = config.filter(|config| config.is_changed()) else {
        return;
    };
    if dilation.is_enabled() != config.dilation.enabled {
        debug!("slowmo enabled: {}", config.dilation.enabled);
    }
    dilation.apply_config(&config.dilation);
}

fn apply_slowmo_requests(mut requests: EventReader<SlowmoRequest>, mut dilation: ResMut<TimeDilation>) {
    for request in requests.read() {
        if dilation.request_slowmo(request.scale, request.duration) {
            debug!("slowmo {:.2} for {:.2}s", request.scale, request.duration);
        }
    }
}

fn update_time_dilation(
    real: Res<Time<Real>>,
    mut virtual_time: ResMut<Time<Virtual>>,
    mut dilation: ResMut<TimeDilation>,
) {
    let had_reset = dilation.pending_reset().is_some();
    let scale = dilation.update(real.delta_secs());
    if had_reset && dilation.pending_reset().is_none() {
        debug!("slowmo reset");
    }
    virtual_time.set_time_scale(scale);
}

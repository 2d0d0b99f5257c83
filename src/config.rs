//! Tunable constants for the locomotion motor.
//!
//! Every magic number of the movement model lives here so it can be tweaked
//! from a TOML file or the inspector instead of being baked into the systems.

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a [`MotorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Resource, Reflect, Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[reflect(Resource)]
#[serde(default)]
pub struct MotorConfig {
    pub surface: SurfaceConfig,
    pub movement: MovementConfig,
    pub jump: JumpConfig,
    pub wall_run: WallRunConfig,
    pub grapple: GrappleConfig,
    pub dilation: DilationConfig,
}

/// Slope limits used to sort contact normals into surface kinds.
#[derive(Reflect, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Steepest slope (degrees from up) that still counts as floor.
    pub floor_slope_max: f32,
    /// Upper bound (exclusive) of the surfable slope band.
    pub surf_slope_max: f32,
    /// How close to 90 degrees a normal must be to count as a wall.
    pub wall_tolerance: f32,
    /// Debounce window for spatial states, in physics ticks.
    pub debounce_ticks: f32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            floor_slope_max: 35.0,
            surf_slope_max: 89.0,
            wall_tolerance: 0.1,
            debounce_ticks: 3.0,
        }
    }
}

/// Force scaling and speed limits for one locomotion context.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextTuning {
    /// Multiplier on forward input force.
    pub forward: f32,
    /// Multiplier on strafe input force.
    pub strafe: f32,
    /// Look-relative speed above which input stops accelerating.
    pub speed_cap: f32,
    /// Absolute horizontal speed ceiling.
    pub ceiling: f32,
}

impl ContextTuning {
    pub const fn new(forward: f32, strafe: f32, speed_cap: f32, ceiling: f32) -> Self {
        Self {
            forward,
            strafe,
            speed_cap,
            ceiling,
        }
    }
}

#[derive(Reflect, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Base acceleration constant, multiplied by the tick duration.
    pub move_force: f32,
    /// Speed cap while sprinting on the ground.
    pub sprint_speed: f32,
    pub grounded: ContextTuning,
    pub sliding: ContextTuning,
    pub airborne: ContextTuning,
    pub wall_running: ContextTuning,
    pub surfing: ContextTuning,
    /// Braking factor of the counter-movement force.
    pub counter_movement: f32,
    /// Look-relative drift below which no braking is applied.
    pub counter_threshold: f32,
    /// Input magnitude treated as "no input" by counter-movement.
    pub input_deadzone: f32,
    /// Flat deceleration factor while crouch-sliding.
    pub slide_slowdown: f32,
    /// One-tick forward force when a slide starts.
    pub slide_boost: f32,
    /// Minimum speed for a crouch to start a slide.
    pub slide_min_speed: f32,
    /// Downward force (times dt) pressing a crouched player into the floor.
    pub crouch_press_force: f32,
    /// Downward force (times dt) added every tick.
    pub extra_gravity: f32,
    /// Collider height scale while crouched.
    pub crouch_height_scale: f32,
    /// Counter-movement is suppressed for this long after an explosion.
    pub explosion_window: f32,
    /// Position below which the player is killed.
    pub kill_height: f32,
    /// Speed above which the action meter targets its maximum.
    pub action_speed: f32,
    pub action_idle: f32,
    pub action_smooth_time: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_force: 4500.0,
            sprint_speed: 30.0,
            grounded: ContextTuning::new(1.0, 1.0, 20.0, 20.0),
            sliding: ContextTuning::new(0.0, 1.0, 20.0, 40.0),
            airborne: ContextTuning::new(0.5, 0.5, 20.0, 40.0),
            wall_running: ContextTuning::new(0.3, 0.09, 16.0, 40.0),
            surfing: ContextTuning::new(0.21, 0.7, 16.0, 60.0),
            counter_movement: 0.16,
            counter_threshold: 0.01,
            input_deadzone: 0.05,
            slide_slowdown: 0.2,
            slide_boost: 400.0,
            slide_min_speed: 0.5,
            crouch_press_force: 3000.0,
            extra_gravity: 10.0,
            crouch_height_scale: 0.5,
            explosion_window: 0.1,
            kill_height: -200.0,
            action_speed: 15.0,
            action_idle: 0.09,
            action_smooth_time: 0.7,
        }
    }
}

#[derive(Reflect, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    /// Base jump impulse.
    pub impulse: f32,
    pub up_factor: f32,
    /// Fraction of the impulse applied along the current contact normal.
    pub normal_factor: f32,
    /// Extra contact-normal impulse when leaving a wall-run.
    pub wall_factor: f32,
    pub cooldown: f32,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            impulse: 11.0,
            up_factor: 1.5,
            normal_factor: 0.5,
            wall_factor: 3.0,
            cooldown: 0.25,
        }
    }
}

#[derive(Reflect, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallRunConfig {
    /// Upward impulse applied when a wall-run starts.
    pub catch_impulse: f32,
    /// Outward push (times dt) while wall-running.
    pub push_force: f32,
    /// Partial gravity compensation; upward force is `mass * 100 * dt * gravity`.
    pub gravity: f32,
    /// Camera roll at a 90 degree look/wall angle.
    pub max_tilt: f32,
    pub tilt_smooth_time: f32,
    /// Below this tilt, running forward counts as steering off the wall.
    pub cancel_inner_tilt: f32,
    /// Above this tilt, backing up counts as steering off the wall.
    pub cancel_outer_tilt: f32,
    /// How long the steering must persist before the detach fires.
    pub cancel_delay: f32,
    pub cancel_force: f32,
    /// Cooldown before a new wall-run may start after a detach.
    pub ready_cooldown: f32,
}

impl Default for WallRunConfig {
    fn default() -> Self {
        Self {
            catch_impulse: 20.0,
            push_force: 225.0,
            gravity: 1.0,
            max_tilt: 15.0,
            tilt_smooth_time: 0.2,
            cancel_inner_tilt: 4.0,
            cancel_outer_tilt: 22.0,
            cancel_delay: 0.2,
            cancel_force: 600.0,
            ready_cooldown: 0.1,
        }
    }
}

#[derive(Reflect, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrappleConfig {
    pub max_range: f32,
    pub min_distance_factor: f32,
    pub max_distance_factor: f32,
    pub spring: f32,
    pub damper: f32,
    pub mass_scale: f32,
    pub rope_points: usize,
    /// Height of the settling wave. Its frequency is the rope length.
    pub wave_amplitude: f32,
    pub anchor_smooth_time: f32,
    pub sag_smooth_time: f32,
    pub aim_rings: usize,
    pub aim_rays_per_ring: usize,
    pub aim_spread: f32,
}

impl Default for GrappleConfig {
    fn default() -> Self {
        Self {
            max_range: 70.0,
            min_distance_factor: 0.25,
            max_distance_factor: 0.8,
            spring: 4.5,
            damper: 7.0,
            mass_scale: 4.5,
            rope_points: 100,
            wave_amplitude: 1.0,
            anchor_smooth_time: 0.03,
            sag_smooth_time: 0.12,
            aim_rings: 10,
            aim_rays_per_ring: 50,
            aim_spread: 0.035,
        }
    }
}

#[derive(Reflect, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DilationConfig {
    pub enabled: bool,
    pub smooth_time: f32,
}

impl Default for DilationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            smooth_time: 0.15,
        }
    }
}

impl MotorConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Debounce window in seconds for a given physics tick length.
    pub fn debounce_delay(&self, tick: f32) -> f32 {
        self.surface.debounce_ticks * tick
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.surface;
        if !(s.floor_slope_max > 0.0 && s.floor_slope_max < s.surf_slope_max && s.surf_slope_max <= 90.0)
        {
            return Err(invalid(
                "surface",
                format!(
                    "expected 0 < floor_slope_max ({}) < surf_slope_max ({}) <= 90",
                    s.floor_slope_max, s.surf_slope_max
                ),
            ));
        }
        if !s.debounce_ticks.is_finite() || s.debounce_ticks < 0.0 {
            return Err(invalid("surface.debounce_ticks", "must be finite and not negative"));
        }
        self.check_finite()?;

        let m = &self.movement;
        for (field, tuning) in [
            ("movement.grounded", &m.grounded),
            ("movement.sliding", &m.sliding),
            ("movement.airborne", &m.airborne),
            ("movement.wall_running", &m.wall_running),
            ("movement.surfing", &m.surfing),
        ] {
            let values = [tuning.forward, tuning.strafe, tuning.speed_cap, tuning.ceiling];
            if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(invalid(field, "values must be finite and non-negative"));
            }
        }
        if !m.move_force.is_finite() || m.action_smooth_time < 0.0 {
            return Err(invalid("movement", "move_force and smooth times must be finite"));
        }

        if self.jump.cooldown < 0.0 || self.wall_run.cancel_delay < 0.0 {
            return Err(invalid("jump/wall_run", "timer durations must not be negative"));
        }
        if self.wall_run.tilt_smooth_time < 0.0 {
            return Err(invalid("wall_run.tilt_smooth_time", "must not be negative"));
        }

        let g = &self.grapple;
        if g.rope_points < 2 {
            return Err(invalid("grapple.rope_points", "needs at least two points"));
        }
        if !(g.min_distance_factor >= 0.0 && g.min_distance_factor <= g.max_distance_factor) {
            return Err(invalid(
                "grapple",
                "min_distance_factor must lie in [0, max_distance_factor]",
            ));
        }
        if g.max_range <= 0.0 || g.anchor_smooth_time < 0.0 || g.sag_smooth_time < 0.0 {
            return Err(invalid("grapple", "range and smooth times must be positive"));
        }

        if self.dilation.smooth_time < 0.0 {
            return Err(invalid("dilation.smooth_time", "must not be negative"));
        }
        Ok(())
    }

    fn check_finite(&self) -> Result<(), ConfigError> {
        let (s, m, j, w, g) = (&self.surface, &self.movement, &self.jump, &self.wall_run, &self.grapple);
        let groups: [(&'static str, &[f32]); 6] = [
            ("surface", &[s.floor_slope_max, s.surf_slope_max, s.wall_tolerance]),
            (
                "movement",
                &[
                    m.move_force,
                    m.sprint_speed,
                    m.counter_movement,
                    m.counter_threshold,
                    m.input_deadzone,
                    m.slide_slowdown,
                    m.slide_boost,
                    m.slide_min_speed,
                    m.crouch_press_force,
                    m.extra_gravity,
                    m.crouch_height_scale,
                    m.explosion_window,
                    m.kill_height,
                    m.action_speed,
                    m.action_idle,
                    m.action_smooth_time,
                ],
            ),
            (
                "jump",
                &[j.impulse, j.up_factor, j.normal_factor, j.wall_factor, j.cooldown],
            ),
            (
                "wall_run",
                &[
                    w.catch_impulse,
                    w.push_force,
                    w.gravity,
                    w.max_tilt,
                    w.tilt_smooth_time,
                    w.cancel_inner_tilt,
                    w.cancel_outer_tilt,
                    w.cancel_delay,
                    w.cancel_force,
                    w.ready_cooldown,
                ],
            ),
            (
                "grapple",
                &[
                    g.max_range,
                    g.min_distance_factor,
                    g.max_distance_factor,
                    g.spring,
                    g.damper,
                    g.mass_scale,
                    g.wave_amplitude,
                    g.anchor_smooth_time,
                    g.sag_smooth_time,
                    g.aim_spread,
                ],
            ),
            ("dilation", &[self.dilation.smooth_time]),
        ];
        match groups
            .iter()
            .find(|(_, values)| values.iter().any(|v| !v.is_finite()))
        {
            Some((field, _)) => Err(invalid(field, "values must be finite")),
            None => Ok(()),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

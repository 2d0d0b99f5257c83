//! Per-tick force computation.
//!
//! Everything here adds forces to the body instead of assigning velocity,
//! except for the explicit horizontal speed clamp.

use bevy::prelude::*;

use super::body::MotorBody;
use crate::config::{ContextTuning, MotorConfig, MovementConfig, WallRunConfig};
use crate::util::{finite_or_zero, heading_yaw, horizontal, wrap_angle, yaw_forward, yaw_right};

/// Which tuning set drives the input forces this tick.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionContext {
    Grounded,
    Sliding,
    Airborne,
    WallRunning,
    Surfing,
}

impl MotionContext {
    pub fn tuning(self, movement: &MovementConfig) -> &ContextTuning {
        match self {
            Self::Grounded => &movement.grounded,
            Self::Sliding => &movement.sliding,
            Self::Airborne => &movement.airborne,
            Self::WallRunning => &movement.wall_running,
            Self::Surfing => &movement.surfing,
        }
    }
}

/// Input axes plus the modifiers the integrator cares about.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveInput {
    /// `x` strafes right, `y` moves forward. Both in `[-1, 1]`.
    pub axes: Vec2,
    pub sprint: bool,
}

/// Wraps a body and remembers what was written to it during one tick.
pub struct TrackedBody<'a, B: MotorBody> {
    inner: &'a mut B,
    force: Vec3,
    impulse: Vec3,
}

impl<'a, B: MotorBody> TrackedBody<'a, B> {
    pub fn new(inner: &'a mut B) -> Self {
        Self {
            inner,
            force: Vec3::ZERO,
            impulse: Vec3::ZERO,
        }
    }

    pub fn force(&self) -> Vec3 {
        self.force
    }

    pub fn impulse(&self) -> Vec3 {
        self.impulse
    }

    /// Velocity change the writes of this tick will cause, gravity excluded.
    pub fn pending_delta_v(&self, dt: f32) -> Vec3 {
        let mass = self.inner.mass();
        if mass <= 0.0 {
            return Vec3::ZERO;
        }
        finite_or_zero((self.force * dt + self.impulse) / mass)
    }
}

impl<B: MotorBody> MotorBody for TrackedBody<'_, B> {
    fn velocity(&self) -> Vec3 {
        self.inner.velocity()
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.inner.set_velocity(velocity);
    }

    fn add_force(&mut self, force: Vec3) {
        let force = finite_or_zero(force);
        self.force += force;
        self.inner.add_force(force);
    }

    fn add_impulse(&mut self, impulse: Vec3) {
        let impulse = finite_or_zero(impulse);
        self.impulse += impulse;
        self.inner.add_impulse(impulse);
    }

    fn mass(&self) -> f32 {
        self.inner.mass()
    }
}

/// Horizontal velocity split into look-relative `(right, forward)` parts.
///
/// The split goes through the signed angle between the velocity heading and
/// the look yaw, so it is well defined for every yaw and falls back to zero
/// for a body that is not moving horizontally.
pub fn look_relative_velocity(velocity: Vec3, yaw: f32) -> Vec2 {
    let flat = horizontal(velocity);
    let speed = flat.length();
    let Some(heading) = heading_yaw(flat) else {
        return Vec2::ZERO;
    };
    if !speed.is_finite() || !yaw.is_finite() {
        return Vec2::ZERO;
    }
    let delta = wrap_angle(heading - yaw);
    Vec2::new(-speed * delta.sin(), speed * delta.cos())
}

/// Braking force that stops drift on axes the player is not driving.
///
/// While crouching it is a flat slide friction against the full velocity.
pub fn counter_movement_force(
    velocity: Vec3,
    relative: Vec2,
    input: Vec2,
    yaw: f32,
    crouching: bool,
    dt: f32,
    movement: &MovementConfig,
) -> Vec3 {
    if crouching {
        return -velocity.normalize_or_zero() * movement.move_force * dt * movement.slide_slowdown;
    }
    let brake = |drift: f32, axis: f32| {
        let threshold = movement.counter_threshold;
        (drift.abs() > threshold && axis.abs() < movement.input_deadzone)
            || (drift < -threshold && axis > 0.0)
            || (drift > threshold && axis < 0.0)
    };
    let mut force = Vec3::ZERO;
    let scale = movement.move_force * dt * movement.counter_movement;
    if brake(relative.x, input.x) {
        force += yaw_right(yaw) * -relative.x * scale;
    }
    if brake(relative.y, input.y) {
        force += yaw_forward(yaw) * -relative.y * scale;
    }
    finite_or_zero(force)
}

/// Drops input on any axis whose look-relative speed already exceeds `cap`
/// in the input's direction. Deceleration is never blocked.
pub fn clamp_input(mut input: Vec2, relative: Vec2, cap: f32) -> Vec2 {
    if (input.x > 0.0 && relative.x > cap) || (input.x < 0.0 && relative.x < -cap) {
        input.x = 0.0;
    }
    if (input.y > 0.0 && relative.y > cap) || (input.y < 0.0 && relative.y < -cap) {
        input.y = 0.0;
    }
    input
}

pub fn drive_force(input: Vec2, yaw: f32, tuning: &ContextTuning, move_force: f32, dt: f32) -> Vec3 {
    let forward = yaw_forward(yaw) * input.y * tuning.forward;
    let strafe = yaw_right(yaw) * input.x * tuning.strafe;
    finite_or_zero((forward + strafe) * move_force * dt)
}

/// Outward push plus partial gravity compensation while on a wall.
pub fn wall_run_force(wall_normal: Vec3, mass: f32, dt: f32, wall_run: &WallRunConfig) -> Vec3 {
    let push = wall_normal.normalize_or_zero() * wall_run.push_force * dt;
    let lift = Vec3::Y * mass * 100.0 * dt * wall_run.gravity;
    finite_or_zero(push + lift)
}

/// Rescales horizontal velocity so that, after this tick's pending writes are
/// integrated, horizontal speed does not exceed `ceiling`. Vertical velocity
/// is untouched. Returns `true` if the velocity was overridden.
pub fn clamp_horizontal_speed<B: MotorBody>(body: &mut TrackedBody<'_, B>, ceiling: f32, dt: f32) -> bool {
    let velocity = body.velocity();
    let delta = body.pending_delta_v(dt);
    let predicted = horizontal(velocity + delta);
    let speed = predicted.length();
    if !speed.is_finite() || speed <= ceiling {
        return false;
    }
    let target = predicted * (ceiling / speed);
    let corrected = target - horizontal(delta);
    body.set_velocity(Vec3::new(corrected.x, velocity.y, corrected.z));
    true
}

/// Flags the integrator needs from the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveState {
    pub context: MotionContext,
    pub grounded: bool,
    pub crouching: bool,
    pub wall_running: bool,
    pub wall_normal: Vec3,
    /// Counter-movement is skipped while jump is held or after an explosion.
    pub suppress_counter: bool,
    /// Crouched on the floor with no jump pending: press down, skip input.
    pub pressing_down: bool,
}

impl DriveState {
    /// No contacts, no modifiers.
    pub fn new(context: MotionContext) -> Self {
        Self {
            context,
            grounded: false,
            crouching: false,
            wall_running: false,
            wall_normal: Vec3::Y,
            suppress_counter: false,
            pressing_down: false,
        }
    }
}

/// Applies one tick of movement forces. The jump impulse is applied by the
/// state machine before this runs so the speed clamp sees it.
pub fn integrate<B: MotorBody>(
    body: &mut TrackedBody<'_, B>,
    drive: &DriveState,
    input: DriveInput,
    yaw: f32,
    dt: f32,
    config: &MotorConfig,
) {
    let movement = &config.movement;
    let context = drive.context;
    let tuning = context.tuning(movement);

    body.add_force(Vec3::NEG_Y * movement.extra_gravity * dt);

    let velocity = body.velocity();
    let relative = look_relative_velocity(velocity, yaw);

    if drive.grounded && !drive.suppress_counter {
        body.add_force(counter_movement_force(
            velocity,
            relative,
            input.axes,
            yaw,
            drive.crouching,
            dt,
            movement,
        ));
    }

    if drive.pressing_down {
        body.add_force(Vec3::NEG_Y * movement.crouch_press_force * dt);
    } else {
        let mut cap = tuning.speed_cap;
        if input.sprint && context == MotionContext::Grounded {
            cap = movement.sprint_speed;
        }
        let axes = clamp_input(input.axes.clamp(Vec2::NEG_ONE, Vec2::ONE), relative, cap);
        body.add_force(drive_force(axes, yaw, tuning, movement.move_force, dt));
    }

    if drive.wall_running {
        let mass = body.mass();
        body.add_force(wall_run_force(drive.wall_normal, mass, dt, &config.wall_run));
    }

    // A held jump or a blast leaves the ground at air speed.
    let mut ceiling = if drive.suppress_counter && context == MotionContext::Grounded {
        movement.airborne.ceiling
    } else {
        tuning.ceiling
    };
    if input.sprint && context == MotionContext::Grounded {
        ceiling = ceiling.max(movement.sprint_speed);
    }
    clamp_horizontal_speed(body, ceiling, dt);
}

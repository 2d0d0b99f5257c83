//! The locomotion state machine.
//!
//! [`PlayerMotor`] owns every movement flag of one player together with the
//! clock its timers run on. One call to [`PlayerMotor::step`] is one physics
//! tick: due timers fire, contacts are classified, transitions run, and
//! finally the force integrator drives the body.

use bevy::prelude::*;

use super::body::MotorBody;
use super::contact::{classify, Contact, SurfaceKind};
use super::debounce::{SpatialState, SpatialTracker};
use super::physics::{self, DriveInput, DriveState, MotionContext, TrackedBody};
use crate::config::MotorConfig;
use crate::schedule::Scheduler;
use crate::util::{heading_yaw, smooth_damp, wrap_angle, yaw_forward};

/// Held controls sampled for the next tick.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct MotorInput {
    /// `x` strafes right, `y` moves forward.
    pub axes: Vec2,
    pub jump: bool,
    pub crouch: bool,
    pub sprint: bool,
}

#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorTimer {
    JumpReady,
    WallRunReady,
    WallRunCancel,
    ExplosionEnd,
}

/// Something worth telling the rest of the game about.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorEvent {
    Landed,
    Jumped { off_wall: bool },
    WallRunStarted,
    WallRunEnded,
    /// The player steered off the wall and was pushed away from it.
    WallRunCancelled,
    CrouchStarted,
    CrouchEnded,
    SlideStarted,
}

/// Snapshot of the motor's flags.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct LocomotionState {
    pub grounded: bool,
    pub on_wall: bool,
    pub wall_running: bool,
    pub surfing: bool,
    pub crouching: bool,
    pub ready_to_jump: bool,
    pub ready_to_wall_run: bool,
    pub exploded: bool,
    pub dead: bool,
    pub wall_normal: Vec3,
    pub ground_normal: Vec3,
}

#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct PlayerMotor {
    clock: f32,
    tracker: SpatialTracker,
    #[reflect(ignore)]
    timers: Scheduler<MotorTimer>,
    wall_running: bool,
    crouching: bool,
    ready_to_jump: bool,
    ready_to_wall_run: bool,
    cancelling_wall_run: bool,
    exploded: bool,
    dead: bool,
    wall_normal: Vec3,
    ground_normal: Vec3,
    surf_normal: Vec3,
    /// Target camera roll in degrees while wall-running.
    wall_tilt: f32,
    action_meter: f32,
    action_meter_velocity: f32,
}

impl Default for PlayerMotor {
    fn default() -> Self {
        Self {
            clock: 0.0,
            tracker: SpatialTracker::default(),
            timers: Scheduler::new(),
            wall_running: false,
            crouching: false,
            ready_to_jump: true,
            ready_to_wall_run: true,
            cancelling_wall_run: false,
            exploded: false,
            dead: false,
            wall_normal: Vec3::Y,
            ground_normal: Vec3::Y,
            surf_normal: Vec3::Y,
            wall_tilt: 0.0,
            action_meter: 0.0,
            action_meter_velocity: 0.0,
        }
    }
}

impl PlayerMotor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one physics tick.
    ///
    /// `contacts` are the contacts reported for this tick, `yaw` is the look
    /// yaw in radians. Returns what happened, in order.
    pub fn step<B: MotorBody>(
        &mut self,
        body: &mut B,
        contacts: &[Contact],
        input: &MotorInput,
        yaw: f32,
        dt: f32,
        config: &MotorConfig,
    ) -> Vec<MotorEvent> {
        let mut events = Vec::new();
        if self.dead || !(dt > 0.0) {
            return events;
        }
        self.clock += dt;
        let mut body = TrackedBody::new(body);

        self.fire_timers(&mut body, config, &mut events);
        self.update_crouch(&mut body, input, yaw, config, &mut events);
        self.apply_contacts(&mut body, contacts, dt, config, &mut events);
        self.steer_wall_run(input, yaw, config);
        if input.jump {
            self.try_jump(&mut body, config, &mut events);
        }

        let grounded = self.is_grounded();
        let drive = DriveState {
            context: self.context(),
            grounded,
            crouching: self.crouching,
            wall_running: self.wall_running,
            wall_normal: self.wall_normal,
            suppress_counter: input.jump || self.exploded,
            pressing_down: self.crouching && grounded && self.ready_to_jump,
        };
        let drive_input = DriveInput {
            axes: input.axes,
            sprint: input.sprint,
        };
        physics::integrate(&mut body, &drive, drive_input, yaw, dt, config);

        let movement = &config.movement;
        let target = if body.velocity().length() > movement.action_speed {
            1.0
        } else {
            movement.action_idle
        };
        self.action_meter = smooth_damp(
            self.action_meter,
            target,
            &mut self.action_meter_velocity,
            movement.action_smooth_time,
            dt,
        );
        events
    }

    fn fire_timers<B: MotorBody>(
        &mut self,
        body: &mut TrackedBody<'_, B>,
        config: &MotorConfig,
        events: &mut Vec<MotorEvent>,
    ) {
        for fallen in self.tracker.update(self.clock) {
            if fallen == SpatialState::OnWall {
                self.end_wall_run(events);
            }
        }
        for timer in self.timers.poll(self.clock) {
            match timer {
                MotorTimer::JumpReady => self.ready_to_jump = true,
                MotorTimer::WallRunReady => self.ready_to_wall_run = true,
                MotorTimer::ExplosionEnd => self.exploded = false,
                MotorTimer::WallRunCancel => self.cancel_wall_run(body, config, events),
            }
        }
    }

    fn update_crouch<B: MotorBody>(
        &mut self,
        body: &mut TrackedBody<'_, B>,
        input: &MotorInput,
        yaw: f32,
        config: &MotorConfig,
        events: &mut Vec<MotorEvent>,
    ) {
        if input.crouch == self.crouching {
            return;
        }
        self.crouching = input.crouch;
        if !self.crouching {
            events.push(MotorEvent::CrouchEnded);
            return;
        }
        events.push(MotorEvent::CrouchStarted);
        let movement = &config.movement;
        if self.is_grounded() && body.velocity().length() > movement.slide_min_speed {
            body.add_force(yaw_forward(yaw) * movement.slide_boost);
            events.push(MotorEvent::SlideStarted);
        }
    }

    fn apply_contacts<B: MotorBody>(
        &mut self,
        body: &mut TrackedBody<'_, B>,
        contacts: &[Contact],
        dt: f32,
        config: &MotorConfig,
        events: &mut Vec<MotorEvent>,
    ) {
        if contacts.is_empty() {
            return;
        }
        let mut classified: Vec<(SurfaceKind, &Contact)> = contacts
            .iter()
            .map(|contact| (classify(contact.normal, &config.surface), contact))
            .collect();
        // Floors first so a simultaneous wall contact cannot start a wall-run.
        classified.sort_by_key(|(kind, _)| *kind != SurfaceKind::Floor);

        for (kind, contact) in classified {
            let normal = contact.normal.normalize_or_zero();
            match kind {
                SurfaceKind::Floor => {
                    self.end_wall_run(events);
                    if !self.is_grounded() {
                        events.push(MotorEvent::Landed);
                    }
                    self.tracker.confirm(SpatialState::Grounded);
                    self.ground_normal = normal;
                }
                SurfaceKind::Wall if contact.wall_runnable => {
                    self.tracker.confirm(SpatialState::OnWall);
                    self.start_wall_run(body, normal, config, events);
                }
                SurfaceKind::Surf => {
                    self.tracker.confirm(SpatialState::Surfing);
                    self.surf_normal = normal;
                }
                _ => {}
            }
        }

        let delay = config.debounce_delay(dt);
        for state in SpatialState::ALL {
            self.tracker
                .schedule_stop_if_unconfirmed(state, self.clock, delay);
        }
    }

    /// Latches onto a wall. Entering a wall-run kills vertical velocity and
    /// adds the catch impulse; staying on one only refreshes the normal.
    fn start_wall_run<B: MotorBody>(
        &mut self,
        body: &mut TrackedBody<'_, B>,
        normal: Vec3,
        config: &MotorConfig,
        events: &mut Vec<MotorEvent>,
    ) {
        if self.is_grounded() || !self.ready_to_wall_run {
            return;
        }
        self.wall_normal = normal;
        if self.wall_running {
            return;
        }
        self.wall_running = true;
        let mut velocity = body.velocity();
        velocity.y = 0.0;
        body.set_velocity(velocity);
        body.add_impulse(Vec3::Y * config.wall_run.catch_impulse);
        events.push(MotorEvent::WallRunStarted);
    }

    fn end_wall_run(&mut self, events: &mut Vec<MotorEvent>) {
        if !self.wall_running {
            return;
        }
        self.wall_running = false;
        self.cancelling_wall_run = false;
        self.timers.cancel(MotorTimer::WallRunCancel);
        events.push(MotorEvent::WallRunEnded);
    }

    fn cancel_wall_run<B: MotorBody>(
        &mut self,
        body: &mut TrackedBody<'_, B>,
        config: &MotorConfig,
        events: &mut Vec<MotorEvent>,
    ) {
        let wall_run = &config.wall_run;
        self.timers
            .schedule(MotorTimer::WallRunReady, self.clock + wall_run.ready_cooldown);
        body.add_force(self.wall_normal * wall_run.cancel_force);
        self.ready_to_wall_run = false;
        self.cancelling_wall_run = false;
        self.wall_running = false;
        events.push(MotorEvent::WallRunCancelled);
    }

    /// Updates the camera tilt and arms or disarms the steer-off detach.
    fn steer_wall_run(&mut self, input: &MotorInput, yaw: f32, config: &MotorConfig) {
        let wall_run = &config.wall_run;
        let wall_yaw = heading_yaw(self.wall_normal);
        let (true, Some(wall_yaw)) = (self.wall_running, wall_yaw) else {
            self.wall_tilt = 0.0;
            self.cancelling_wall_run = false;
            self.timers.cancel(MotorTimer::WallRunCancel);
            return;
        };
        let delta = wrap_angle(wall_yaw - yaw).to_degrees();
        self.wall_tilt = delta / 90.0 * wall_run.max_tilt;
        if !self.ready_to_wall_run {
            return;
        }

        let tilt = self.wall_tilt.abs();
        let straight = input.axes.x.abs() < 0.1;
        let steering_off = straight
            && ((tilt < wall_run.cancel_inner_tilt && input.axes.y > 0.0)
                || (tilt > wall_run.cancel_outer_tilt && input.axes.y < 0.0));
        if steering_off {
            if !self.cancelling_wall_run {
                self.cancelling_wall_run = true;
                self.timers
                    .schedule(MotorTimer::WallRunCancel, self.clock + wall_run.cancel_delay);
            }
        } else if self.cancelling_wall_run {
            self.cancelling_wall_run = false;
            self.timers.cancel(MotorTimer::WallRunCancel);
        }
    }

    fn try_jump<B: MotorBody>(
        &mut self,
        body: &mut TrackedBody<'_, B>,
        config: &MotorConfig,
        events: &mut Vec<MotorEvent>,
    ) -> bool {
        let supported = self.is_grounded() || self.wall_running || self.is_surfing();
        if !self.ready_to_jump || !supported {
            return false;
        }
        self.ready_to_jump = false;

        let mut velocity = body.velocity();
        if velocity.y < 0.5 {
            velocity.y = 0.0;
        } else {
            velocity.y *= 0.5;
        }
        body.set_velocity(velocity);

        let jump = &config.jump;
        body.add_impulse(Vec3::Y * jump.impulse * jump.up_factor);
        body.add_impulse(self.contact_normal() * jump.impulse * jump.normal_factor);
        let off_wall = self.wall_running;
        if off_wall {
            body.add_impulse(self.wall_normal * jump.impulse * jump.wall_factor);
            self.end_wall_run(events);
        }

        self.timers
            .schedule(MotorTimer::JumpReady, self.clock + jump.cooldown);
        events.push(MotorEvent::Jumped { off_wall });
        true
    }

    /// Normal of the surface a jump would push off from.
    pub fn contact_normal(&self) -> Vec3 {
        if self.wall_running {
            self.wall_normal
        } else if self.is_grounded() {
            self.ground_normal
        } else if self.is_surfing() {
            self.surf_normal
        } else {
            self.ground_normal
        }
    }

    pub fn context(&self) -> MotionContext {
        if self.is_surfing() {
            MotionContext::Surfing
        } else if self.wall_running {
            MotionContext::WallRunning
        } else if self.is_grounded() && self.crouching {
            MotionContext::Sliding
        } else if self.is_grounded() {
            MotionContext::Grounded
        } else {
            MotionContext::Airborne
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.tracker.is_active(SpatialState::Grounded)
    }

    pub fn is_surfing(&self) -> bool {
        self.tracker.is_active(SpatialState::Surfing)
    }

    pub fn is_wall_running(&self) -> bool {
        self.wall_running
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_crouching(&self) -> bool {
        self.crouching
    }

    pub fn state(&self) -> LocomotionState {
        LocomotionState {
            grounded: self.is_grounded(),
            on_wall: self.tracker.is_active(SpatialState::OnWall),
            wall_running: self.wall_running,
            surfing: self.is_surfing(),
            crouching: self.crouching,
            ready_to_jump: self.ready_to_jump,
            ready_to_wall_run: self.ready_to_wall_run,
            exploded: self.exploded,
            dead: self.dead,
            wall_normal: self.wall_normal,
            ground_normal: self.ground_normal,
        }
    }

    /// Seconds of simulation this motor has stepped through.
    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn wall_tilt(&self) -> f32 {
        self.wall_tilt
    }

    /// Smoothed 0..1 measure of how fast the player is going.
    pub fn action_meter(&self) -> f32 {
        self.action_meter
    }

    pub fn timer_deadline(&self, timer: MotorTimer) -> Option<f32> {
        self.timers.deadline(timer)
    }

    /// Suppresses counter-movement for `window` seconds so a blast can carry
    /// the player.
    pub fn explode(&mut self, window: f32) {
        if self.dead {
            return;
        }
        self.exploded = true;
        self.timers
            .schedule(MotorTimer::ExplosionEnd, self.clock + window);
    }

    /// Stops the motor, clears every state flag and drops every pending
    /// timer. Returns `false` if the player was already dead.
    pub fn kill(&mut self) -> bool {
        if self.dead {
            return false;
        }
        self.dead = true;
        self.timers.clear();
        self.tracker.reset();
        self.wall_running = false;
        self.cancelling_wall_run = false;
        self.crouching = false;
        self.ready_to_jump = false;
        self.ready_to_wall_run = false;
        self.exploded = false;
        self.wall_tilt = 0.0;
        true
    }

    /// Brings the motor back in its initial state, keeping the clock.
    pub fn respawn(&mut self) {
        *self = Self {
            clock: self.clock,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::body::SimBody;
    use crate::util::horizontal;
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 64.0;

    fn floor() -> Contact {
        Contact::new(Vec3::Y, true)
    }

    fn right_wall() -> Contact {
        Contact::new(Vec3::NEG_X, true)
    }

    fn tick(
        motor: &mut PlayerMotor,
        body: &mut SimBody,
        contacts: &[Contact],
        input: MotorInput,
        yaw: f32,
    ) -> Vec<MotorEvent> {
        let events = motor.step(body, contacts, &input, yaw, DT, &MotorConfig::default());
        body.step(DT);
        events
    }

    #[test]
    fn grounded_survives_short_contact_gaps() {
        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default();
        let events = tick(&mut motor, &mut body, &[floor()], MotorInput::default(), 0.0);
        assert_eq!(events, vec![MotorEvent::Landed]);
        assert!(motor.is_grounded());

        tick(&mut motor, &mut body, &[], MotorInput::default(), 0.0);
        tick(&mut motor, &mut body, &[], MotorInput::default(), 0.0);
        assert!(motor.is_grounded());
        tick(&mut motor, &mut body, &[], MotorInput::default(), 0.0);
        tick(&mut motor, &mut body, &[], MotorInput::default(), 0.0);
        assert!(!motor.is_grounded());
    }

    #[test]
    fn wall_contact_in_air_starts_wall_run_with_catch() {
        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default().with_velocity(Vec3::new(0.0, -6.0, -10.0));
        let config = MotorConfig::default();
        let events = motor.step(&mut body, &[right_wall()], &MotorInput::default(), 0.0, DT, &config);
        assert!(events.contains(&MotorEvent::WallRunStarted));
        assert!(motor.is_wall_running());
        assert_relative_eq!(body.velocity.y, 0.0);
        assert!(body.accumulated_impulse().y >= config.wall_run.catch_impulse);
        assert_eq!(motor.context(), MotionContext::WallRunning);
    }

    #[test]
    fn no_wall_run_while_grounded_or_on_plain_walls() {
        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default();
        tick(&mut motor, &mut body, &[right_wall(), floor()], MotorInput::default(), 0.0);
        assert!(!motor.is_wall_running());

        let mut motor = PlayerMotor::new();
        let plain = Contact::new(Vec3::NEG_X, false);
        tick(&mut motor, &mut body, &[plain], MotorInput::default(), 0.0);
        assert!(!motor.is_wall_running());
        assert!(!motor.state().on_wall);
    }

    #[test]
    fn touching_floor_ends_wall_run() {
        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default();
        tick(&mut motor, &mut body, &[right_wall()], MotorInput::default(), 0.0);
        assert!(motor.is_wall_running());
        let events = tick(&mut motor, &mut body, &[floor()], MotorInput::default(), 0.0);
        assert!(events.contains(&MotorEvent::WallRunEnded));
        assert!(!motor.is_wall_running());
        assert!(motor.is_grounded());
    }

    #[test]
    fn leaving_the_wall_ends_wall_run_after_debounce() {
        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default();
        tick(&mut motor, &mut body, &[right_wall()], MotorInput::default(), 0.0);
        let mut ended = false;
        for _ in 0..5 {
            ended |= tick(&mut motor, &mut body, &[], MotorInput::default(), 0.0)
                .contains(&MotorEvent::WallRunEnded);
        }
        assert!(ended);
        assert!(!motor.is_wall_running());
    }

    #[test]
    fn jump_rearms_after_exact_cooldown() {
        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default();
        let jump = MotorInput {
            jump: true,
            ..Default::default()
        };
        let events = tick(&mut motor, &mut body, &[floor()], jump, 0.0);
        assert!(events.contains(&MotorEvent::Jumped { off_wall: false }));
        assert!(!motor.state().ready_to_jump);
        assert_eq!(motor.timer_deadline(MotorTimer::JumpReady), Some(DT + 0.25));

        for _ in 2..=16 {
            tick(&mut motor, &mut body, &[floor()], MotorInput::default(), 0.0);
            assert!(!motor.state().ready_to_jump);
        }
        tick(&mut motor, &mut body, &[floor()], MotorInput::default(), 0.0);
        assert!(motor.state().ready_to_jump);
    }

    #[test]
    fn jump_resets_falling_and_halves_rising_velocity() {
        let config = MotorConfig::default();
        let jump = MotorInput {
            jump: true,
            ..Default::default()
        };

        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default().with_velocity(Vec3::NEG_Y * 4.0);
        motor.step(&mut body, &[floor()], &jump, 0.0, DT, &config);
        assert_relative_eq!(body.velocity.y, 0.0);

        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default().with_velocity(Vec3::Y * 4.0);
        motor.step(&mut body, &[floor()], &jump, 0.0, DT, &config);
        assert_relative_eq!(body.velocity.y, 2.0);
        let expected = config.jump.impulse * (config.jump.up_factor + config.jump.normal_factor);
        assert_relative_eq!(body.accumulated_impulse().y, expected, epsilon = 1e-4);
    }

    #[test]
    fn jump_without_support_is_ignored() {
        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default().with_velocity(Vec3::NEG_Y * 3.0);
        let jump = MotorInput {
            jump: true,
            ..Default::default()
        };
        let events = motor.step(&mut body, &[], &jump, 0.0, DT, &MotorConfig::default());
        assert!(events.is_empty());
        assert!(motor.state().ready_to_jump);
        assert_eq!(body.accumulated_impulse(), Vec3::ZERO);
    }

    #[test]
    fn wall_jump_kicks_away_and_ends_wall_run() {
        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default();
        tick(&mut motor, &mut body, &[right_wall()], MotorInput::default(), 0.0);
        let jump = MotorInput {
            jump: true,
            ..Default::default()
        };
        let events = motor.step(&mut body, &[right_wall()], &jump, 0.0, DT, &MotorConfig::default());
        assert!(events.contains(&MotorEvent::Jumped { off_wall: true }));
        assert!(!motor.is_wall_running());
        assert!(body.accumulated_impulse().x < 0.0);
    }

    #[test]
    fn steering_off_the_wall_detaches_after_delay() {
        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default();
        let away = heading_yaw(Vec3::NEG_X).unwrap();
        let forward = MotorInput {
            axes: Vec2::Y,
            ..Default::default()
        };
        for _ in 0..12 {
            tick(&mut motor, &mut body, &[right_wall()], forward, away);
            assert!(motor.is_wall_running());
        }
        let mut cancelled = false;
        for _ in 0..3 {
            cancelled |= tick(&mut motor, &mut body, &[right_wall()], forward, away)
                .contains(&MotorEvent::WallRunCancelled);
        }
        assert!(cancelled);
        assert!(!motor.is_wall_running());
        assert!(!motor.state().ready_to_wall_run);

        let mut restarted = false;
        for _ in 0..8 {
            restarted |= tick(&mut motor, &mut body, &[right_wall()], MotorInput::default(), away)
                .contains(&MotorEvent::WallRunStarted);
        }
        assert!(restarted);
    }

    #[test]
    fn running_along_the_wall_tilts_without_detaching() {
        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default();
        let forward = MotorInput {
            axes: Vec2::Y,
            ..Default::default()
        };
        for _ in 0..40 {
            tick(&mut motor, &mut body, &[right_wall()], forward, 0.0);
        }
        assert!(motor.is_wall_running());
        assert_relative_eq!(motor.wall_tilt().abs(), 15.0, epsilon = 1e-3);
    }

    #[test]
    fn crouch_on_moving_floor_starts_slide() {
        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default().with_velocity(Vec3::NEG_Z * 8.0);
        tick(&mut motor, &mut body, &[floor()], MotorInput::default(), 0.0);
        let crouch = MotorInput {
            crouch: true,
            ..Default::default()
        };
        let events = tick(&mut motor, &mut body, &[floor()], crouch, 0.0);
        assert_eq!(events, vec![MotorEvent::CrouchStarted, MotorEvent::SlideStarted]);
        assert_eq!(motor.context(), MotionContext::Sliding);
        let events = tick(&mut motor, &mut body, &[floor()], MotorInput::default(), 0.0);
        assert_eq!(events, vec![MotorEvent::CrouchEnded]);
    }

    #[test]
    fn explosion_suppresses_braking_for_its_window() {
        let config = MotorConfig::default();
        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default();
        tick(&mut motor, &mut body, &[floor()], MotorInput::default(), 0.0);

        motor.explode(config.movement.explosion_window);
        body.velocity = Vec3::X * 10.0;
        motor.step(&mut body, &[floor()], &MotorInput::default(), 0.0, DT, &config);
        assert_relative_eq!(body.accumulated_force().x, 0.0);
        body.step(DT);

        for _ in 0..8 {
            tick(&mut motor, &mut body, &[floor()], MotorInput::default(), 0.0);
        }
        assert!(!motor.state().exploded);
        motor.step(&mut body, &[floor()], &MotorInput::default(), 0.0, DT, &config);
        assert!(body.accumulated_force().x < 0.0);
    }

    #[test]
    fn explosion_carries_past_the_ground_ceiling() {
        let config = MotorConfig::default();
        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default();
        tick(&mut motor, &mut body, &[floor()], MotorInput::default(), 0.0);

        motor.explode(config.movement.explosion_window);
        body.velocity = Vec3::new(35.0, 3.0, 0.0);
        tick(&mut motor, &mut body, &[floor()], MotorInput::default(), 0.0);
        assert!(motor.is_grounded());
        assert!(horizontal(body.velocity).length() > config.movement.grounded.ceiling);

        for _ in 0..8 {
            tick(&mut motor, &mut body, &[floor()], MotorInput::default(), 0.0);
        }
        assert!(!motor.state().exploded);
        assert!(horizontal(body.velocity).length() <= config.movement.grounded.ceiling + 1e-3);
    }

    #[test]
    fn held_jump_lands_without_the_ground_ceiling() {
        let config = MotorConfig::default();
        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default();
        let jump = MotorInput {
            jump: true,
            ..Default::default()
        };
        tick(&mut motor, &mut body, &[floor()], jump, 0.0);
        body.velocity = Vec3::new(0.0, -5.0, -30.0);
        tick(&mut motor, &mut body, &[floor()], jump, 0.0);
        assert!(horizontal(body.velocity).length() > config.movement.grounded.ceiling);
    }

    #[test]
    fn dead_motor_ignores_ticks_until_respawn() {
        let mut motor = PlayerMotor::new();
        let mut body = SimBody::default();
        let jump = MotorInput {
            jump: true,
            ..Default::default()
        };
        tick(&mut motor, &mut body, &[floor()], jump, 0.0);
        let crouch = MotorInput {
            crouch: true,
            ..Default::default()
        };
        tick(&mut motor, &mut body, &[right_wall()], crouch, 0.0);
        assert!(motor.is_crouching());
        motor.explode(0.1);

        assert!(motor.kill());
        assert!(!motor.kill());
        assert_eq!(motor.timer_deadline(MotorTimer::JumpReady), None);
        let state = motor.state();
        assert!(state.dead);
        assert!(!state.grounded);
        assert!(!state.on_wall);
        assert!(!state.wall_running);
        assert!(!state.surfing);
        assert!(!state.crouching);
        assert!(!state.ready_to_jump);
        assert!(!state.ready_to_wall_run);
        assert!(!state.exploded);
        assert_eq!(motor.wall_tilt(), 0.0);

        let clock = motor.clock();
        assert!(tick(&mut motor, &mut body, &[floor()], jump, 0.0).is_empty());
        assert_eq!(motor.clock(), clock);

        motor.respawn();
        assert!(!motor.is_dead());
        assert!(motor.state().ready_to_jump);
        assert_eq!(motor.clock(), clock);
    }
}

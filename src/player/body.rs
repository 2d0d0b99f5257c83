//! Rigid body access for the motor.
//!
//! The motor never owns a body; it reads velocity and mass and writes forces,
//! impulses and the occasional velocity override through [`MotorBody`].

use avian3d::prelude::*;
use bevy::prelude::*;

pub trait MotorBody {
    fn velocity(&self) -> Vec3;
    fn set_velocity(&mut self, velocity: Vec3);
    /// Adds a force for the current physics step.
    fn add_force(&mut self, force: Vec3);
    /// Adds an instantaneous change in momentum.
    fn add_impulse(&mut self, impulse: Vec3);
    fn mass(&self) -> f32;
}

/// Avian components of one dynamic body.
pub struct AvianBody<'a> {
    pub velocity: &'a mut LinearVelocity,
    pub force: &'a mut ExternalForce,
    pub impulse: &'a mut ExternalImpulse,
    pub mass: f32,
}

impl MotorBody for AvianBody<'_> {
    fn velocity(&self) -> Vec3 {
        self.velocity.0
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        if velocity.is_finite() {
            self.velocity.0 = velocity;
        }
    }

    fn add_force(&mut self, force: Vec3) {
        if force.is_finite() {
            self.force.apply_force(force);
        }
    }

    fn add_impulse(&mut self, impulse: Vec3) {
        if impulse.is_finite() {
            self.impulse.apply_impulse(impulse);
        }
    }

    fn mass(&self) -> f32 {
        self.mass
    }
}

/// A free-floating body integrated with explicit Euler steps.
///
/// Useful wherever the motor has to run without a physics world, such as
/// tests and offline tuning tools.
#[derive(Debug, Clone, PartialEq)]
pub struct SimBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub mass: f32,
    pub gravity: Vec3,
    /// Linear drag coefficient, applied as `v *= 1 / (1 + drag * dt)`.
    pub drag: f32,
    force: Vec3,
    impulse: Vec3,
}

impl Default for SimBody {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            mass: 1.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            drag: 0.0,
            force: Vec3::ZERO,
            impulse: Vec3::ZERO,
        }
    }
}

impl SimBody {
    pub fn new(mass: f32) -> Self {
        Self {
            mass,
            ..Default::default()
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Force accumulated since the last [`SimBody::step`].
    pub fn accumulated_force(&self) -> Vec3 {
        self.force
    }

    pub fn accumulated_impulse(&self) -> Vec3 {
        self.impulse
    }

    /// Velocity the body will have after the next step, ignoring gravity.
    pub fn predicted_velocity(&self, dt: f32) -> Vec3 {
        self.velocity + (self.force * dt + self.impulse) / self.mass
    }

    pub fn step(&mut self, dt: f32) {
        let inv_mass = 1.0 / self.mass.max(1e-6);
        self.velocity += (self.force * inv_mass + self.gravity) * dt + self.impulse * inv_mass;
        self.velocity /= 1.0 + self.drag * dt;
        self.position += self.velocity * dt;
        self.force = Vec3::ZERO;
        self.impulse = Vec3::ZERO;
    }
}

impl MotorBody for SimBody {
    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        if velocity.is_finite() {
            self.velocity = velocity;
        }
    }

    fn add_force(&mut self, force: Vec3) {
        if force.is_finite() {
            self.force += force;
        }
    }

    fn add_impulse(&mut self, impulse: Vec3) {
        if impulse.is_finite() {
            self.impulse += impulse;
        }
    }

    fn mass(&self) -> f32 {
        self.mass
    }
}

//! Momentum-based first-person locomotion for Bevy and Avian.
//!
//! The movement model is force driven: every physics tick the
//! [`PlayerMotor`](player::state::PlayerMotor) classifies the contacts of the
//! last step, updates its debounced spatial states and adds forces and
//! impulses to the body. On top of that sit a grappling hook with a
//! spring-damper rope and a smoothed slow-motion controller.
//!
//! The core types work on plain `bevy::math` values and can be driven without
//! an `App`, see [`player::body::SimBody`].

use bevy::prelude::*;

pub mod config;
pub mod player;
pub mod schedule;
pub mod slowmo;
pub mod util;

use config::MotorConfig;
use player::PlayerPlugin;
use slowmo::SlowmoPlugin;

#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameState {
    #[default]
    Playing,
    Paused,
}

/// Adds the player, slow motion and pause handling. Physics plugins are
/// left to the app.
pub struct MomentumPlugin;

impl Plugin for MomentumPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<GameState>();
        app.init_resource::<MotorConfig>();
        app.register_type::<MotorConfig>();
        app.add_plugins((PlayerPlugin, SlowmoPlugin));
        app.add_systems(OnEnter(GameState::Paused), pause_time);
        app.add_systems(OnExit(GameState::Paused), resume_time);
    }
}

fn pause_time(mut time: ResMut<Time<Virtual>>) {
    debug!("paused");
    time.pause();
}

fn resume_time(mut time: ResMut<Time<Virtual>>) {
    debug!("resumed");
    time.unpause();
}

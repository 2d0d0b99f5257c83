use std::f32::consts::PI;

use avian3d::prelude::*;
use bevy::{core_pipeline::motion_blur::MotionBlur, prelude::*};

use super::state::PlayerMotor;
use super::{LookOrientation, Player, EYE_HEIGHT};
use crate::config::MotorConfig;
use crate::util::smooth_damp;

/// First-person view. Roll leans away from the wall while wall-running.
#[derive(Component, Reflect, Debug, Default)]
#[reflect(Component)]
pub struct PlayerCamera {
    pub roll: f32,
    roll_velocity: f32,
}

pub fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: PI / 2.5,
            ..Default::default()
        }),
        Transform::default(),
        MotionBlur {
            shutter_angle: 1.0,
            ..Default::default()
        },
        PlayerCamera::default(),
        Name::new("PlayerCamera"),
    ));
}

pub fn track_camera(
    query: Query<(&Position, &Transform, &LookOrientation, &PlayerMotor), With<Player>>,
    mut camera_query: Query<(&mut Transform, &mut PlayerCamera), Without<Player>>,
    config: Res<MotorConfig>,
    time: Res<Time>,
) {
    let Ok((Position(position), body_transform, look, motor)) = query.get_single() else {
        return;
    };
    let wall_run = &config.wall_run;
    let eye = *position + Vec3::Y * EYE_HEIGHT * body_transform.scale.y;
    for (mut transform, mut camera) in camera_query.iter_mut() {
        let mut roll_velocity = camera.roll_velocity;
        camera.roll = smooth_damp(
            camera.roll,
            motor.wall_tilt().to_radians(),
            &mut roll_velocity,
            wall_run.tilt_smooth_time,
            time.delta_secs(),
        );
        camera.roll_velocity = roll_velocity;
        transform.translation = eye;
        transform.rotation = Quat::from_euler(EulerRot::YXZ, look.yaw, look.pitch, camera.roll);
    }
}

use std::f32::consts::FRAC_PI_2;

use avian3d::prelude::*;
use bevy::{log::LogPlugin, prelude::*};
use bevy_inspector_egui::quick::WorldInspectorPlugin;
use momentum::{
    config::MotorConfig,
    player::{Explosion, Layer, Player, PlayerSpawn},
    slowmo::SlowmoRequest,
    MomentumPlugin,
};

const CONFIG_PATH: &str = "assets/locomotion.toml";

fn load_config(mut commands: Commands) {
    match MotorConfig::load(CONFIG_PATH) {
        Ok(config) => {
            info!("loaded {CONFIG_PATH}");
            commands.insert_resource(config);
        }
        Err(err) => warn!("{err}, using default tuning"),
    }
}

fn static_block(
    commands: &mut Commands,
    mesh: Handle<Mesh>,
    material: Handle<StandardMaterial>,
    size: Vec3,
    transform: Transform,
    name: &str,
) {
    commands.spawn((
        RigidBody::Static,
        // Scaled by the transform below.
        Collider::cuboid(1.0, 1.0, 1.0),
        CollisionLayers::new(Layer::Ground, [Layer::Player, Layer::Object]),
        Mesh3d(mesh),
        MeshMaterial3d(material),
        transform.with_scale(size),
        Name::new(name.to_string()),
    ));
}

fn load_level(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let cube = meshes.add(Cuboid::new(1.0, 1.0, 1.0));
    let concrete = materials.add(Color::srgb(0.55, 0.55, 0.58));
    let wall = materials.add(Color::srgb(0.35, 0.4, 0.5));
    let ramp = materials.add(Color::srgb(0.6, 0.45, 0.3));

    static_block(
        &mut commands,
        cube.clone(),
        concrete.clone(),
        Vec3::new(200.0, 1.0, 200.0),
        Transform::from_xyz(0.0, -0.5, 0.0),
        "Floor",
    );
    for (i, x) in [-6.0, 6.0].into_iter().enumerate() {
        static_block(
            &mut commands,
            cube.clone(),
            wall.clone(),
            Vec3::new(1.0, 12.0, 60.0),
            Transform::from_xyz(x, 6.0, -40.0),
            &format!("RunWall{i}"),
        );
    }
    // Steep enough to surf, too steep to stand on.
    static_block(
        &mut commands,
        cube.clone(),
        ramp,
        Vec3::new(20.0, 1.0, 60.0),
        Transform::from_xyz(30.0, 6.0, -20.0).with_rotation(Quat::from_rotation_z(50f32.to_radians())),
        "SurfRamp",
    );
    static_block(
        &mut commands,
        cube.clone(),
        concrete,
        Vec3::new(8.0, 1.0, 8.0),
        Transform::from_xyz(0.0, 14.0, -80.0),
        "HighPlatform",
    );

    commands.spawn((
        RigidBody::Dynamic,
        Collider::cuboid(1.0, 1.0, 1.0),
        CollisionLayers::new(Layer::Object, [Layer::Player, Layer::Ground, Layer::Object]),
        Mass(5.0),
        Mesh3d(cube),
        MeshMaterial3d(materials.add(Color::srgb(0.8, 0.3, 0.2))),
        Transform::from_xyz(-15.0, 0.75, -10.0).with_scale(Vec3::splat(1.5)),
        Name::new("Crate"),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..Default::default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::YXZ, 0.6, -FRAC_PI_2 * 0.6, 0.0)),
        Name::new("Sun"),
    ));
    commands.spawn((
        PlayerSpawn,
        Transform::from_xyz(0.0, 2.0, 10.0),
        Name::new("PlayerSpawn"),
    ));
}

fn debug_controls(
    keys: Res<ButtonInput<KeyCode>>,
    players: Query<Entity, With<Player>>,
    mut slowmo: EventWriter<SlowmoRequest>,
    mut explosions: EventWriter<Explosion>,
) {
    if keys.just_pressed(KeyCode::KeyT) {
        slowmo.send(SlowmoRequest {
            scale: 0.35,
            duration: 0.8,
        });
    }
    if keys.just_pressed(KeyCode::KeyB) {
        for entity in players.iter() {
            explosions.send(Explosion {
                entity,
                impulse: Vec3::new(0.0, 12.0, -8.0),
            });
        }
    }
}

fn main() {
    App::new()
        .insert_resource(Time::<Fixed>::from_hz(64.0))
        .add_plugins(DefaultPlugins.set(LogPlugin {
            filter: "wgpu=error,naga=warn,momentum=debug".to_string(),
            ..Default::default()
        }))
        .add_plugins(PhysicsPlugins::default())
        .add_plugins(WorldInspectorPlugin::new())
        .add_plugins(bevy_framepace::FramepacePlugin)
        .add_plugins(MomentumPlugin)
        .add_systems(PreStartup, load_config)
        .add_systems(Startup, load_level)
        .add_systems(Update, debug_controls)
        .run();
}

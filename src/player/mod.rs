use avian3d::prelude::*;
use bevy::{
    color::palettes::css::{ORANGE, WHITE},
    prelude::*,
};
use leafwing_input_manager::prelude::*;

use crate::config::MotorConfig;
use crate::slowmo::TimeDilation;
use crate::util::horizontal;
use crate::GameState;

pub mod body;
pub mod camera;
pub mod contact;
pub mod debounce;
pub mod grapple;
pub mod physics;
pub mod rope;
pub mod state;

use body::AvianBody;
use contact::Contact;
use grapple::{AnchorPoint, AvianRaycast, Grapple};
use state::{LocomotionState, MotorEvent, MotorInput, PlayerMotor};

pub const CAPSULE_RADIUS: f32 = 0.5;
pub const CAPSULE_HEIGHT: f32 = 2.0;
/// Eye height above the body center while standing.
pub const EYE_HEIGHT: f32 = 0.6;
const MOUSE_SENSITIVITY: f32 = 0.003;

#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Reflect)]
pub enum PlayerAction {
    Move,
    Look,
    Jump,
    Crouch,
    Sprint,
    Grapple,
    Pause,
    Respawn,
}

impl Actionlike for PlayerAction {
    fn input_control_kind(&self) -> InputControlKind {
        match self {
            Self::Move | Self::Look => InputControlKind::DualAxis,
            _ => InputControlKind::Button,
        }
    }
}

impl PlayerAction {
    fn default_input_map() -> InputMap<Self> {
        let mut input_map = InputMap::default();
        input_map.insert_dual_axis(Self::Move, VirtualDPad::wasd());
        input_map.insert_dual_axis(Self::Look, MouseMove::default());
        input_map.insert(Self::Jump, KeyCode::Space);
        input_map.insert(Self::Crouch, KeyCode::ControlLeft);
        input_map.insert(Self::Sprint, KeyCode::ShiftLeft);
        input_map.insert(Self::Grapple, MouseButton::Right);
        input_map.insert(Self::Pause, KeyCode::Escape);
        input_map.insert(Self::Respawn, KeyCode::KeyR);
        input_map
    }
}

/// Collision categories. Ground accepts wall-runs, objects only count as
/// contacts, enemies are ignored by the motor.
#[derive(PhysicsLayer, Clone, Copy, Debug, Default)]
pub enum Layer {
    #[default]
    Default,
    Player,
    Ground,
    Object,
    Enemy,
}

/// Marks where a player should be spawned.
#[derive(Component, Reflect, Debug, Default)]
#[reflect(Component)]
pub struct PlayerSpawn;

#[derive(Component, Debug)]
struct PlayerSpawned;

#[derive(Component, Reflect, Debug)]
#[reflect(Component)]
pub struct Player;

#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct SpawnPoint(pub Vec3);

/// Look angles in radians. Yaw turns about +Y, pitch is clamped to ±90°.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct LookOrientation {
    pub yaw: f32,
    pub pitch: f32,
}

impl LookOrientation {
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }
}

/// Values other game code reads for HUDs, audio and camera effects.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct MotorReadout {
    pub state: LocomotionState,
    pub horizontal_speed: f32,
    /// `(right, forward)` velocity relative to the look yaw.
    pub relative_velocity: Vec2,
    pub action_meter: f32,
    pub grapple_anchor: Option<Vec3>,
}

impl Default for MotorReadout {
    fn default() -> Self {
        Self {
            state: PlayerMotor::default().state(),
            horizontal_speed: 0.0,
            relative_velocity: Vec2::ZERO,
            action_meter: 0.0,
            grapple_anchor: None,
        }
    }
}

#[derive(Event, Debug, Clone, Copy)]
pub struct LocomotionEvent {
    pub entity: Entity,
    pub event: MotorEvent,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct KillPlayer {
    pub entity: Entity,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct RespawnPlayer {
    pub entity: Entity,
}

/// A blast hitting the player. Counter-movement is suspended briefly so the
/// impulse carries.
#[derive(Event, Debug, Clone, Copy)]
pub struct Explosion {
    pub entity: Entity,
    pub impulse: Vec3,
}

fn spawn_player(
    mut commands: Commands,
    query: Query<(Entity, &GlobalTransform), (With<PlayerSpawn>, Without<PlayerSpawned>)>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (entity, transform) in query.iter() {
        commands.entity(entity).insert(PlayerSpawned);
        let spawn = transform.translation();
        info!("spawning player at {spawn}");
        let capsule = meshes.add(Capsule3d::new(
            CAPSULE_RADIUS,
            CAPSULE_HEIGHT - 2.0 * CAPSULE_RADIUS,
        ));
        commands
            .spawn((
                Collider::capsule(CAPSULE_RADIUS, CAPSULE_HEIGHT - 2.0 * CAPSULE_RADIUS),
                CollisionLayers::new(Layer::Player, [Layer::Ground, Layer::Object, Layer::Enemy]),
                RigidBody::Dynamic,
                LockedAxes::ROTATION_LOCKED,
                Mass(1.0),
                Position::from(spawn),
                Transform::from_translation(spawn),
                ExternalForce::default().with_persistence(false),
                ExternalImpulse::default().with_persistence(false),
                Restitution::new(0.0).with_combine_rule(CoefficientCombine::Min),
                Friction::new(0.0).with_combine_rule(CoefficientCombine::Min),
            ))
            .insert((
                Player,
                PlayerMotor::new(),
                MotorInput::default(),
                MotorReadout::default(),
                LookOrientation::default(),
                Grapple::default(),
                SpawnPoint(spawn),
                InputManagerBundle::<PlayerAction>::with_map(PlayerAction::default_input_map()),
                Name::new("PlayerBody"),
            ))
            .insert((
                Mesh3d(capsule),
                MeshMaterial3d(materials.add(Color::WHITE)),
                Visibility::Hidden,
            ));
    }
}

fn read_player_input(
    mut query: Query<
        (
            &ActionState<PlayerAction>,
            &mut MotorInput,
            &mut LookOrientation,
        ),
        With<Player>,
    >,
) {
    for (action_state, mut input, mut look) in query.iter_mut() {
        input.axes = action_state.clamped_axis_pair(&PlayerAction::Move);
        input.jump = action_state.pressed(&PlayerAction::Jump);
        input.crouch = action_state.pressed(&PlayerAction::Crouch);
        input.sprint = action_state.pressed(&PlayerAction::Sprint);

        let look_input = action_state.axis_pair(&PlayerAction::Look);
        look.yaw -= look_input.x * MOUSE_SENSITIVITY;
        look.pitch = (look.pitch - look_input.y * MOUSE_SENSITIVITY)
            .clamp(-std::f32::consts::FRAC_PI_2, std::f32::consts::FRAC_PI_2);
    }
}

/// Contacts touching `player` this step, with normals pointing at the player.
fn gather_contacts(
    player: Entity,
    rotation: &Rotation,
    collisions: &Collisions,
    layers: &Query<&CollisionLayers>,
) -> Vec<Contact> {
    let mut contacts = Vec::new();
    for pair in collisions.collisions_with_entity(player) {
        let first = pair.entity1 == player;
        let other = if first { pair.entity2 } else { pair.entity1 };
        let Ok(other_layers) = layers.get(other) else {
            continue;
        };
        let wall_runnable = other_layers.memberships.has_all(Layer::Ground);
        if !wall_runnable && !other_layers.memberships.has_all(Layer::Object) {
            continue;
        }
        for manifold in pair.manifolds.iter() {
            let normal = if first {
                -manifold.global_normal1(rotation)
            } else {
                -manifold.global_normal2(rotation)
            };
            contacts.extend(
                manifold
                    .contacts
                    .iter()
                    .map(|_| Contact::new(normal, wall_runnable)),
            );
        }
    }
    contacts
}

#[allow(clippy::type_complexity)]
fn drive_motor(
    mut query: Query<
        (
            Entity,
            &mut PlayerMotor,
            &MotorInput,
            &LookOrientation,
            &Rotation,
            &mut LinearVelocity,
            &mut ExternalForce,
            &mut ExternalImpulse,
            &ComputedMass,
        ),
        With<Player>,
    >,
    collisions: Res<Collisions>,
    layers: Query<&CollisionLayers>,
    config: Res<MotorConfig>,
    time: Res<Time>,
    mut events: EventWriter<LocomotionEvent>,
) {
    let dt = time.delta_secs();
    for (entity, mut motor, input, look, rotation, mut velocity, mut force, mut impulse, mass) in
        query.iter_mut()
    {
        let contacts = gather_contacts(entity, rotation, &collisions, &layers);
        let mut body = AvianBody {
            velocity: &mut velocity,
            force: &mut force,
            impulse: &mut impulse,
            mass: mass.value(),
        };
        for event in motor.step(&mut body, &contacts, input, look.yaw, dt, &config) {
            debug!("{entity}: {event:?}");
            events.send(LocomotionEvent { entity, event });
        }
    }
}

fn sync_crouch_height(
    mut query: Query<(&PlayerMotor, &mut Transform, &mut Position), With<Player>>,
    config: Res<MotorConfig>,
) {
    let crouched = config.movement.crouch_height_scale;
    for (motor, mut transform, mut position) in query.iter_mut() {
        let target = if motor.is_crouching() { crouched } else { 1.0 };
        let current = transform.scale.y;
        if (current - target).abs() < f32::EPSILON {
            continue;
        }
        let shift = (target - current) * CAPSULE_HEIGHT * 0.5;
        transform.scale.y = target;
        transform.translation.y += shift;
        position.0.y += shift;
    }
}

#[allow(clippy::type_complexity)]
fn grapple_controls(
    mut query: Query<
        (
            Entity,
            &ActionState<PlayerAction>,
            &mut Grapple,
            &PlayerMotor,
            &Position,
            &Transform,
            &LookOrientation,
        ),
        With<Player>,
    >,
    spatial_query: SpatialQuery,
    colliders: Query<&ColliderParent>,
    bodies: Query<(&RigidBody, &Position, &Rotation), Without<Player>>,
    config: Res<MotorConfig>,
) {
    let body_pose = |collider: Entity| {
        let body = colliders
            .get(collider)
            .map(|parent| parent.get())
            .unwrap_or(collider);
        let (rigid_body, Position(position), Rotation(rotation)) = bodies.get(body).ok()?;
        (!rigid_body.is_static()).then_some((body, *position, *rotation))
    };
    for (entity, action_state, mut grapple, motor, Position(position), transform, look) in
        query.iter_mut()
    {
        if motor.is_dead() {
            continue;
        }
        let filter = SpatialQueryFilter::from_mask([Layer::Ground, Layer::Object])
            .with_excluded_entities([entity]);
        let caster = AvianRaycast {
            query: &spatial_query,
            filter: &filter,
            body_pose,
        };
        let eye = *position + Vec3::Y * EYE_HEIGHT * transform.scale.y;
        let forward = look.forward();

        if action_state.just_released(&PlayerAction::Grapple) && grapple.detach() {
            debug!("{entity}: grapple released");
        }
        if action_state.just_pressed(&PlayerAction::Grapple) {
            let tip = eye + look.rotation() * Vec3::new(0.3, -0.2, -0.5);
            match grapple.try_attach(&caster, eye, forward, *position, tip, &config.grapple) {
                Some(link) => debug!("{entity}: grapple attached at {}", link.anchor_world),
                None => debug!("{entity}: grapple found no anchor"),
            }
        }
        grapple.update_aim_preview(&caster, eye, forward, &config.grapple);
    }
}

#[allow(clippy::type_complexity)]
fn apply_grapple_constraint(
    mut query: Query<
        (
            Entity,
            &mut Grapple,
            &Position,
            &mut LinearVelocity,
            &mut ExternalForce,
            &mut ExternalImpulse,
            &ComputedMass,
        ),
        With<Player>,
    >,
    anchors: Query<(&Position, &Rotation, Option<&LinearVelocity>), Without<Player>>,
) {
    for (entity, mut grapple, Position(position), mut velocity, mut force, mut impulse, mass) in
        query.iter_mut()
    {
        let attached = grapple.is_grappling();
        if grapple
            .resolve_anchor(|anchor| anchors.get(anchor).ok().map(|(p, r, _)| (p.0, r.0)))
            .is_none()
        {
            if attached {
                debug!("{entity}: grapple anchor lost");
            }
            continue;
        }
        let anchor_velocity = match grapple.link().map(|link| link.anchor) {
            Some(AnchorPoint::Body { entity, .. }) => anchors
                .get(entity)
                .ok()
                .and_then(|(_, _, velocity)| velocity.map(|v| v.0))
                .unwrap_or(Vec3::ZERO),
            _ => Vec3::ZERO,
        };
        let mut body = AvianBody {
            velocity: &mut velocity,
            force: &mut force,
            impulse: &mut impulse,
            mass: mass.value(),
        };
        grapple.apply_constraint(&mut body, *position, anchor_velocity);
    }
}

fn update_rope(
    mut query: Query<(&mut Grapple, &Position, &Transform, &LookOrientation), With<Player>>,
    config: Res<MotorConfig>,
    time: Res<Time>,
) {
    for (mut grapple, Position(position), transform, look) in query.iter_mut() {
        let eye = *position + Vec3::Y * EYE_HEIGHT * transform.scale.y;
        let tip = eye + look.rotation() * Vec3::new(0.3, -0.2, -0.5);
        grapple.update_rope(tip, time.delta_secs(), &config.grapple);
    }
}

fn draw_rope(query: Query<&Grapple, With<Player>>, mut gizmos: Gizmos) {
    for grapple in query.iter() {
        let points = grapple.rope().points();
        if points.len() >= 2 {
            gizmos.linestrip(points.iter().copied(), Color::from(WHITE));
        } else if let Some(preview) = grapple.aim_preview() {
            gizmos.sphere(
                Isometry3d::from_translation(preview.point),
                0.25,
                Color::from(ORANGE),
            );
        }
    }
}

fn update_readout(
    mut query: Query<(&PlayerMotor, &Grapple, &LinearVelocity, &LookOrientation, &mut MotorReadout)>,
) {
    for (motor, grapple, LinearVelocity(velocity), look, mut readout) in query.iter_mut() {
        *readout = MotorReadout {
            state: motor.state(),
            horizontal_speed: horizontal(*velocity).length(),
            relative_velocity: physics::look_relative_velocity(*velocity, look.yaw),
            action_meter: motor.action_meter(),
            grapple_anchor: grapple.anchor(),
        };
    }
}

fn kill_below_world(
    query: Query<(Entity, &Position, &PlayerMotor), With<Player>>,
    config: Res<MotorConfig>,
    mut kills: EventWriter<KillPlayer>,
) {
    for (entity, Position(position), motor) in query.iter() {
        if position.y < config.movement.kill_height && !motor.is_dead() {
            kills.send(KillPlayer { entity });
        }
    }
}

fn respawn_controls(
    query: Query<(Entity, &ActionState<PlayerAction>), With<Player>>,
    mut respawns: EventWriter<RespawnPlayer>,
) {
    for (entity, action_state) in query.iter() {
        if action_state.just_pressed(&PlayerAction::Respawn) {
            respawns.send(RespawnPlayer { entity });
        }
    }
}

#[allow(clippy::type_complexity)]
fn handle_player_events(
    mut kills: EventReader<KillPlayer>,
    mut respawns: EventReader<RespawnPlayer>,
    mut explosions: EventReader<Explosion>,
    mut query: Query<
        (
            &mut PlayerMotor,
            &mut Grapple,
            &SpawnPoint,
            &mut Position,
            &mut LinearVelocity,
            &mut ExternalImpulse,
        ),
        With<Player>,
    >,
    mut dilation: ResMut<TimeDilation>,
    config: Res<MotorConfig>,
) {
    for KillPlayer { entity } in kills.read() {
        let Ok((mut motor, mut grapple, ..)) = query.get_mut(*entity) else {
            continue;
        };
        if motor.kill() {
            grapple.detach();
            dilation.reset();
            info!("{entity}: killed");
        }
    }
    for RespawnPlayer { entity } in respawns.read() {
        let Ok((mut motor, mut grapple, SpawnPoint(spawn), mut position, mut velocity, _)) =
            query.get_mut(*entity)
        else {
            continue;
        };
        motor.respawn();
        grapple.detach();
        position.0 = *spawn;
        velocity.0 = Vec3::ZERO;
        info!("{entity}: respawned at {spawn}");
    }
    for Explosion { entity, impulse: blast } in explosions.read() {
        let Ok((mut motor, .., mut impulse)) = query.get_mut(*entity) else {
            continue;
        };
        if motor.is_dead() {
            continue;
        }
        motor.explode(config.movement.explosion_window);
        impulse.apply_impulse(*blast);
        debug!("{entity}: explosion {blast}");
    }
}

fn toggle_pause(
    query: Query<&ActionState<PlayerAction>, With<Player>>,
    state: Res<State<GameState>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if query
        .iter()
        .any(|action_state| action_state.just_pressed(&PlayerAction::Pause))
    {
        next_state.set(match state.get() {
            GameState::Playing => GameState::Paused,
            GameState::Paused => GameState::Playing,
        });
    }
}

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(InputManagerPlugin::<PlayerAction>::default());
        app.register_type::<PlayerSpawn>();
        app.register_type::<Player>();
        app.register_type::<PlayerMotor>();
        app.register_type::<MotorInput>();
        app.register_type::<MotorReadout>();
        app.register_type::<LookOrientation>();
        app.register_type::<Grapple>();
        app.add_event::<LocomotionEvent>();
        app.add_event::<KillPlayer>();
        app.add_event::<RespawnPlayer>();
        app.add_event::<Explosion>();
        app.add_systems(Startup, camera::spawn_camera);
        app.add_systems(Update, (spawn_player, toggle_pause));
        app.add_systems(
            Update,
            (
                (read_player_input, respawn_controls, grapple_controls),
                update_rope,
                draw_rope,
                update_readout,
                camera::track_camera,
            )
                .chain()
                .run_if(in_state(GameState::Playing)),
        );
        app.add_systems(
            FixedUpdate,
            (
                handle_player_events,
                kill_below_world,
                drive_motor,
                sync_crouch_height,
                apply_grapple_constraint,
            )
                .chain()
                .run_if(in_state(GameState::Playing)),
        );
    }
}

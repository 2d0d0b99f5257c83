//! Grappling hook: target acquisition, the spring-damper link and the rope.

use std::f32::consts::TAU;

use avian3d::prelude::*;
use bevy::prelude::*;

use super::body::MotorBody;
use super::rope::RopeCurve;
use crate::config::GrappleConfig;
use crate::util::finite_or_zero;

/// Where a rope is fixed.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub enum AnchorPoint {
    World(Vec3),
    /// Fixed to a moving body, in that body's local space.
    Body { entity: Entity, local: Vec3 },
}

#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct GrappleHit {
    pub point: Vec3,
    pub distance: f32,
    pub anchor: AnchorPoint,
}

/// Ray queries against the level, as seen from the grappling player.
pub trait GrappleRaycast {
    /// First valid hit along `direction` within `max_range`. Hits on the
    /// player's own colliders must not be reported.
    fn cast(&self, origin: Vec3, direction: Vec3, max_range: f32) -> Option<GrappleHit>;
}

impl<F> GrappleRaycast for F
where
    F: Fn(Vec3, Vec3, f32) -> Option<GrappleHit>,
{
    fn cast(&self, origin: Vec3, direction: Vec3, max_range: f32) -> Option<GrappleHit> {
        self(origin, direction, max_range)
    }
}

/// [`GrappleRaycast`] backed by avian's spatial query.
///
/// `body_pose` maps a hit collider to the pose of the non-static body it
/// belongs to, so anchors on moving bodies are stored in local space.
pub struct AvianRaycast<'a, 'w, 's, F> {
    pub query: &'a SpatialQuery<'w, 's>,
    pub filter: &'a SpatialQueryFilter,
    pub body_pose: F,
}

impl<F> GrappleRaycast for AvianRaycast<'_, '_, '_, F>
where
    F: Fn(Entity) -> Option<(Entity, Vec3, Quat)>,
{
    fn cast(&self, origin: Vec3, direction: Vec3, max_range: f32) -> Option<GrappleHit> {
        let dir = Dir3::new(direction).ok()?;
        let hit = self
            .query
            .cast_ray(origin, dir, max_range, true, self.filter)?;
        let point = origin + *dir * hit.distance;
        let anchor = match (self.body_pose)(hit.entity) {
            Some((entity, position, rotation)) => AnchorPoint::Body {
                entity,
                local: rotation.inverse() * (point - position),
            },
            None => AnchorPoint::World(point),
        };
        Some(GrappleHit {
            point,
            distance: hit.distance,
            anchor,
        })
    }
}

/// Searches rings of rays around `forward`, widening until a ring hits, and
/// returns the nearest hit of that ring.
pub fn aim_assist<R: GrappleRaycast>(
    caster: &R,
    origin: Vec3,
    forward: Vec3,
    config: &GrappleConfig,
) -> Option<GrappleHit> {
    let forward = forward.try_normalize()?;
    let right = forward.any_orthonormal_vector();
    let up = right.cross(forward);
    let rays = config.aim_rays_per_ring.max(1);
    for ring in 1..=config.aim_rings {
        let radius = ring as f32 * config.aim_spread;
        let nearest = (0..rays)
            .filter_map(|k| {
                let angle = TAU / rays as f32 * k as f32;
                let offset = (right * angle.cos() + up * angle.sin()) * radius;
                caster.cast(origin, forward + offset, config.max_range)
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance));
        if nearest.is_some() {
            return nearest;
        }
    }
    None
}

/// Active distance constraint between the player and an anchor.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct GrappleLink {
    pub anchor: AnchorPoint,
    /// Anchor position in world space, refreshed every tick.
    pub anchor_world: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    pub spring: f32,
    pub damper: f32,
    pub mass_scale: f32,
}

impl GrappleLink {
    pub fn new(anchor: AnchorPoint, anchor_world: Vec3, distance: f32, config: &GrappleConfig) -> Self {
        Self {
            anchor,
            anchor_world,
            min_distance: distance * config.min_distance_factor,
            max_distance: distance * config.max_distance_factor,
            spring: config.spring,
            damper: config.damper,
            mass_scale: config.mass_scale,
        }
    }

    /// Force on the player. Zero while the rope length is within bounds,
    /// otherwise a spring toward the nearest bound damped by the radial
    /// relative velocity.
    pub fn constraint_force(&self, player: Vec3, relative_velocity: Vec3) -> Vec3 {
        let offset = player - self.anchor_world;
        let distance = offset.length();
        let Some(dir) = offset.try_normalize() else {
            return Vec3::ZERO;
        };
        let excess = if distance > self.max_distance {
            distance - self.max_distance
        } else if distance < self.min_distance {
            distance - self.min_distance
        } else {
            return Vec3::ZERO;
        };
        let radial_speed = relative_velocity.dot(dir);
        let magnitude = self.mass_scale * (self.spring * excess + self.damper * radial_speed);
        finite_or_zero(-dir * magnitude)
    }
}

/// Grappling hook state of one player.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct Grapple {
    link: Option<GrappleLink>,
    aim_preview: Option<GrappleHit>,
    rope: RopeCurve,
}

impl Grapple {
    pub fn is_grappling(&self) -> bool {
        self.link.is_some()
    }

    pub fn link(&self) -> Option<&GrappleLink> {
        self.link.as_ref()
    }

    /// World position of the current anchor.
    pub fn anchor(&self) -> Option<Vec3> {
        self.link.map(|link| link.anchor_world)
    }

    pub fn aim_preview(&self) -> Option<&GrappleHit> {
        self.aim_preview.as_ref()
    }

    pub fn rope(&self) -> &RopeCurve {
        &self.rope
    }

    /// Refreshes the aim-assist preview. A direct hit needs no preview; a
    /// total miss keeps the previous one.
    pub fn update_aim_preview<R: GrappleRaycast>(
        &mut self,
        caster: &R,
        origin: Vec3,
        forward: Vec3,
        config: &GrappleConfig,
    ) {
        if self.is_grappling() {
            return;
        }
        if caster.cast(origin, forward, config.max_range).is_some() {
            self.aim_preview = None;
        } else if let Some(hit) = aim_assist(caster, origin, forward, config) {
            self.aim_preview = Some(hit);
        }
    }

    /// Shoots the hook along `direction` from `origin`, falling back to the
    /// aim preview on a miss. `player` is the body position the rope bounds
    /// are measured from and `tip` is where the drawn rope starts.
    ///
    /// Returns the new link, or `None` if nothing was attached (including
    /// when a link already exists).
    pub fn try_attach<R: GrappleRaycast>(
        &mut self,
        caster: &R,
        origin: Vec3,
        direction: Vec3,
        player: Vec3,
        tip: Vec3,
        config: &GrappleConfig,
    ) -> Option<GrappleLink> {
        if self.is_grappling() {
            return None;
        }
        let hit = caster
            .cast(origin, direction, config.max_range)
            .or(self.aim_preview)?;
        let link = GrappleLink::new(hit.anchor, hit.point, hit.point.distance(player), config);
        self.link = Some(link);
        self.aim_preview = None;
        self.rope.reset(tip);
        Some(link)
    }

    /// Drops the link. Returns `false` if there was none.
    pub fn detach(&mut self) -> bool {
        self.rope.clear();
        self.link.take().is_some()
    }

    /// Re-reads the pose of the anchor body. The link is dropped if the body
    /// is gone.
    pub fn resolve_anchor(&mut self, body_pose: impl Fn(Entity) -> Option<(Vec3, Quat)>) -> Option<Vec3> {
        let link = self.link.as_mut()?;
        if let AnchorPoint::Body { entity, local } = link.anchor {
            match body_pose(entity) {
                Some((position, rotation)) => link.anchor_world = position + rotation * local,
                None => {
                    self.detach();
                    return None;
                }
            }
        }
        self.anchor()
    }

    /// Applies the constraint force of the current link, if any.
    pub fn apply_constraint<B: MotorBody>(&self, body: &mut B, player: Vec3, anchor_velocity: Vec3) -> Vec3 {
        let Some(link) = &self.link else {
            return Vec3::ZERO;
        };
        let force = link.constraint_force(player, body.velocity() - anchor_velocity);
        body.add_force(force);
        force
    }

    pub fn update_rope(&mut self, tip: Vec3, dt: f32, config: &GrappleConfig) {
        let anchor = self.anchor();
        self.rope.update(tip, anchor, dt, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::body::SimBody;
    use approx::assert_relative_eq;

    /// A single infinite wall at `z = -20`.
    fn wall(origin: Vec3, direction: Vec3, max_range: f32) -> Option<GrappleHit> {
        let dir = direction.try_normalize()?;
        if dir.z >= -1e-4 {
            return None;
        }
        let distance = (origin.z + 20.0) / -dir.z;
        (distance <= max_range).then(|| {
            let point = origin + dir * distance;
            GrappleHit {
                point,
                distance,
                anchor: AnchorPoint::World(point),
            }
        })
    }

    /// A small target slightly off to the right of `-Z`.
    fn small_target(origin: Vec3, direction: Vec3, _max_range: f32) -> Option<GrappleHit> {
        let dir = direction.try_normalize()?;
        let point = origin + dir * 30.0;
        (point.x > 0.6 && point.x < 1.2 && point.y.abs() < 0.3 && dir.z < 0.0).then_some(GrappleHit {
            point,
            distance: 30.0,
            anchor: AnchorPoint::World(point),
        })
    }

    fn miss(_: Vec3, _: Vec3, _: f32) -> Option<GrappleHit> {
        None
    }

    #[test]
    fn attach_sets_anchor_and_bounds() {
        let config = GrappleConfig::default();
        let mut grapple = Grapple::default();
        let link = grapple
            .try_attach(&wall, Vec3::ZERO, Vec3::NEG_Z, Vec3::ZERO, Vec3::ZERO, &config)
            .unwrap();
        assert_eq!(grapple.anchor(), Some(Vec3::new(0.0, 0.0, -20.0)));
        assert_relative_eq!(link.max_distance, 16.0);
        assert_relative_eq!(link.min_distance, 5.0);

        grapple.update_rope(Vec3::ZERO, 1.0 / 60.0, &config);
        assert_eq!(grapple.rope().points().len(), config.rope_points);
    }

    #[test]
    fn attaching_twice_is_a_no_op() {
        let config = GrappleConfig::default();
        let mut grapple = Grapple::default();
        grapple.try_attach(&wall, Vec3::ZERO, Vec3::NEG_Z, Vec3::ZERO, Vec3::ZERO, &config);
        let dir = Vec3::new(0.3, 0.0, -1.0);
        assert!(grapple
            .try_attach(&wall, Vec3::ZERO, dir, Vec3::ZERO, Vec3::ZERO, &config)
            .is_none());
        assert_eq!(grapple.anchor(), Some(Vec3::new(0.0, 0.0, -20.0)));
    }

    #[test]
    fn miss_without_preview_does_not_attach() {
        let config = GrappleConfig::default();
        let mut grapple = Grapple::default();
        assert!(grapple
            .try_attach(&miss, Vec3::ZERO, Vec3::NEG_Z, Vec3::ZERO, Vec3::ZERO, &config)
            .is_none());
        assert!(!grapple.is_grappling());
        assert!(grapple.anchor().is_none());
    }

    #[test]
    fn out_of_range_is_a_miss() {
        let config = GrappleConfig {
            max_range: 10.0,
            ..Default::default()
        };
        let mut grapple = Grapple::default();
        assert!(grapple
            .try_attach(&wall, Vec3::ZERO, Vec3::NEG_Z, Vec3::ZERO, Vec3::ZERO, &config)
            .is_none());
    }

    #[test]
    fn detach_is_idempotent_and_empties_rope() {
        let config = GrappleConfig::default();
        let mut grapple = Grapple::default();
        grapple.try_attach(&wall, Vec3::ZERO, Vec3::NEG_Z, Vec3::ZERO, Vec3::ZERO, &config);
        grapple.update_rope(Vec3::ZERO, 1.0 / 60.0, &config);
        assert!(grapple.detach());
        assert!(!grapple.detach());
        assert!(grapple.rope().points().is_empty());
        grapple.update_rope(Vec3::ZERO, 1.0 / 60.0, &config);
        assert!(grapple.rope().points().is_empty());
    }

    #[test]
    fn aim_assist_finds_nearby_target() {
        let config = GrappleConfig::default();
        let mut grapple = Grapple::default();
        grapple.update_aim_preview(&small_target, Vec3::ZERO, Vec3::NEG_Z, &config);
        let preview = grapple.aim_preview().copied().unwrap();
        assert!(preview.point.x > 0.6);

        grapple.update_aim_preview(&miss, Vec3::ZERO, Vec3::NEG_Z, &config);
        assert_eq!(grapple.aim_preview(), Some(&preview));

        let link = grapple
            .try_attach(&miss, Vec3::ZERO, Vec3::NEG_Z, Vec3::ZERO, Vec3::ZERO, &config)
            .unwrap();
        assert_eq!(link.anchor_world, preview.point);
        assert!(grapple.aim_preview().is_none());
    }

    #[test]
    fn constraint_is_slack_within_bounds() {
        let link = GrappleLink::new(AnchorPoint::World(Vec3::ZERO), Vec3::ZERO, 20.0, &GrappleConfig::default());
        assert_eq!(link.constraint_force(Vec3::X * 10.0, Vec3::X * 3.0), Vec3::ZERO);
    }

    #[test]
    fn constraint_pulls_back_when_stretched() {
        let config = GrappleConfig::default();
        let link = GrappleLink::new(AnchorPoint::World(Vec3::ZERO), Vec3::ZERO, 20.0, &config);
        let force = link.constraint_force(Vec3::X * 18.0, Vec3::ZERO);
        assert_relative_eq!(force.x, -config.mass_scale * config.spring * 2.0, epsilon = 1e-4);

        let damped = link.constraint_force(Vec3::X * 18.0, Vec3::X * 2.0);
        assert!(damped.x < force.x);
    }

    #[test]
    fn constraint_pushes_out_when_too_close() {
        let link = GrappleLink::new(AnchorPoint::World(Vec3::ZERO), Vec3::ZERO, 20.0, &GrappleConfig::default());
        let force = link.constraint_force(Vec3::Y * 2.0, Vec3::ZERO);
        assert!(force.y > 0.0);
        assert_eq!(link.constraint_force(Vec3::ZERO, Vec3::ZERO), Vec3::ZERO);
    }

    #[test]
    fn apply_constraint_writes_force_to_body() {
        let config = GrappleConfig::default();
        let mut grapple = Grapple::default();
        let mut body = SimBody::default();
        assert_eq!(grapple.apply_constraint(&mut body, Vec3::ZERO, Vec3::ZERO), Vec3::ZERO);

        grapple.try_attach(&wall, Vec3::ZERO, Vec3::NEG_Z, Vec3::ZERO, Vec3::ZERO, &config);
        let force = grapple.apply_constraint(&mut body, Vec3::Z * 5.0, Vec3::ZERO);
        assert!(force.z < 0.0);
        assert_eq!(body.accumulated_force(), force);
    }

    #[test]
    fn body_anchor_follows_its_body() {
        let config = GrappleConfig::default();
        let entity = Entity::from_raw(7);
        let on_body = move |origin: Vec3, direction: Vec3, _: f32| {
            let point = origin + direction.normalize() * 10.0;
            Some(GrappleHit {
                point,
                distance: 10.0,
                anchor: AnchorPoint::Body {
                    entity,
                    local: Vec3::X,
                },
            })
        };
        let mut grapple = Grapple::default();
        grapple.try_attach(&on_body, Vec3::ZERO, Vec3::NEG_Z, Vec3::ZERO, Vec3::ZERO, &config);

        let moved = grapple.resolve_anchor(|e| (e == entity).then_some((Vec3::Y * 3.0, Quat::IDENTITY)));
        assert_eq!(moved, Some(Vec3::new(1.0, 3.0, 0.0)));

        assert_eq!(grapple.resolve_anchor(|_| None), None);
        assert!(!grapple.is_grappling());
    }
}

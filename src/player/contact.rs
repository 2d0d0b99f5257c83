use bevy::prelude::*;

use crate::config::SurfaceConfig;

/// Category of a surface, judged from its contact normal.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Floor,
    Wall,
    Surf,
    Roof,
    None,
}

/// One contact point against the level, as seen from the player.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Surface normal pointing toward the player.
    pub normal: Vec3,
    /// Whether the touched collider accepts wall-runs.
    pub wall_runnable: bool,
}

impl Contact {
    pub fn new(normal: Vec3, wall_runnable: bool) -> Self {
        Self {
            normal,
            wall_runnable,
        }
    }
}

/// Angle in degrees between world up and `normal`.
pub fn slope_angle(normal: Vec3) -> Option<f32> {
    let normal = normal.try_normalize()?;
    Some(normal.dot(Vec3::Y).clamp(-1.0, 1.0).acos().to_degrees())
}

/// Sorts a contact normal into a [`SurfaceKind`].
///
/// Floor below `floor_slope_max`, wall within `wall_tolerance` of 90 degrees,
/// surf strictly between `floor_slope_max` and `surf_slope_max`, roof for a
/// straight-down normal.
pub fn classify(normal: Vec3, surface: &SurfaceConfig) -> SurfaceKind {
    let Some(angle) = slope_angle(normal) else {
        return SurfaceKind::None;
    };
    if angle < surface.floor_slope_max {
        SurfaceKind::Floor
    } else if (90.0 - angle).abs() < surface.wall_tolerance {
        SurfaceKind::Wall
    } else if angle > surface.floor_slope_max && angle < surface.surf_slope_max {
        SurfaceKind::Surf
    } else if normal.normalize().y <= -1.0 + 1e-5 {
        SurfaceKind::Roof
    } else {
        SurfaceKind::None
    }
}

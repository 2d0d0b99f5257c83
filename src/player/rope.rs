use std::f32::consts::{FRAC_PI_2, PI};

use bevy::prelude::*;

use crate::config::GrappleConfig;
use crate::util::{smooth_damp, smooth_damp_vec3};

/// Sample points of the drawn grapple rope.
///
/// The far end chases the anchor and a wave along the rope decays to zero
/// after attach, so the rope settles instead of snapping taut.
#[derive(Reflect, Debug, Clone, Default, PartialEq)]
pub struct RopeCurve {
    points: Vec<Vec3>,
    end: Vec3,
    end_velocity: Vec3,
    sag: f32,
    sag_velocity: f32,
}

impl RopeCurve {
    /// Starts a new rope at the shooter's tip with full sag.
    pub fn reset(&mut self, tip: Vec3) {
        self.points.clear();
        self.end = tip;
        self.end_velocity = Vec3::ZERO;
        self.sag = 1.0;
        self.sag_velocity = 0.0;
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.sag = 0.0;
        self.sag_velocity = 0.0;
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn sag(&self) -> f32 {
        self.sag
    }

    /// Smoothed position of the far end.
    pub fn end(&self) -> Vec3 {
        self.end
    }

    /// Recomputes the samples between `tip` and `anchor`. With no anchor the
    /// curve is empty.
    pub fn update(&mut self, tip: Vec3, anchor: Option<Vec3>, dt: f32, config: &GrappleConfig) {
        let Some(anchor) = anchor else {
            self.clear();
            return;
        };
        self.end = smooth_damp_vec3(
            self.end,
            anchor,
            &mut self.end_velocity,
            config.anchor_smooth_time,
            dt,
        );
        self.sag = smooth_damp(self.sag, 0.0, &mut self.sag_velocity, config.sag_smooth_time, dt);

        let count = config.rope_points.max(2);
        let chord = self.end - tip;
        let length = chord.length();
        let perpendicular = chord_perpendicular(chord);
        let wave_scale = (self.sag * FRAC_PI_2).cos();

        self.points.clear();
        self.points.reserve(count);
        self.points.push(tip);
        for i in 1..count - 1 {
            let t = i as f32 / count as f32;
            let phase = t * self.sag;
            let wave = ((phase * length).sin() - 0.5) * config.wave_amplitude * phase * 2.0;
            let droop = self.sag * (t * PI).sin();
            let base = tip + chord / count as f32 * i as f32;
            self.points
                .push(base + perpendicular * wave * wave_scale + Vec3::NEG_Y * droop);
        }
        self.points.push(self.end);
    }
}

/// Unit vector perpendicular to `chord` in the vertical plane through it.
fn chord_perpendicular(chord: Vec3) -> Vec3 {
    let Some(dir) = chord.try_normalize() else {
        return Vec3::Y;
    };
    dir.cross(Vec3::Y)
        .cross(dir)
        .try_normalize()
        .unwrap_or_else(|| dir.any_orthonormal_vector())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn curve_has_configured_point_count_and_pinned_ends() {
        let config = GrappleConfig::default();
        let mut rope = RopeCurve::default();
        rope.reset(Vec3::ZERO);
        let anchor = Vec3::new(10.0, 5.0, 0.0);
        rope.update(Vec3::ZERO, Some(anchor), DT, &config);
        assert_eq!(rope.points().len(), config.rope_points);
        assert_eq!(rope.points()[0], Vec3::ZERO);
        assert_eq!(*rope.points().last().unwrap(), rope.end());
    }

    #[test]
    fn no_anchor_means_no_points() {
        let config = GrappleConfig::default();
        let mut rope = RopeCurve::default();
        rope.reset(Vec3::ZERO);
        rope.update(Vec3::ZERO, Some(Vec3::X * 5.0), DT, &config);
        rope.update(Vec3::ZERO, None, DT, &config);
        assert!(rope.points().is_empty());
    }

    #[test]
    fn rope_settles_onto_the_chord() {
        let config = GrappleConfig::default();
        let mut rope = RopeCurve::default();
        let anchor = Vec3::new(0.0, 20.0, -30.0);
        rope.reset(Vec3::ZERO);
        rope.update(Vec3::ZERO, Some(anchor), DT, &config);
        assert!(rope.sag() > 0.5);

        for _ in 0..120 {
            rope.update(Vec3::ZERO, Some(anchor), DT, &config);
        }
        assert!(rope.sag() < 1e-2);
        assert_relative_eq!(rope.end().distance(anchor), 0.0, epsilon = 1e-2);
        let middle = rope.points()[config.rope_points / 2];
        let straight = anchor * 0.5;
        assert!(middle.distance(straight) < 0.5);
    }

    #[test]
    fn wave_frequency_follows_rope_length() {
        let config = GrappleConfig::default();
        let anchor = Vec3::X * 10.0;
        let mut rope = RopeCurve {
            end: anchor,
            sag: 0.5,
            ..Default::default()
        };
        // A zero step leaves the end and the sag where they are.
        rope.update(Vec3::ZERO, Some(anchor), 0.0, &config);

        let t: f32 = 25.0 / 100.0;
        let phase = t * 0.5;
        let wave = ((phase * 10.0).sin() - 0.5) * 1.0 * (phase * 2.0);
        let expected_y = wave * (0.5 * FRAC_PI_2).cos() - 0.5 * (t * PI).sin();
        let sample = rope.points()[25];
        assert_relative_eq!(sample.x, 2.5, epsilon = 1e-5);
        assert_relative_eq!(sample.y, expected_y, epsilon = 1e-5);
        assert_relative_eq!(sample.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn perpendicular_handles_vertical_chords() {
        let perp = chord_perpendicular(Vec3::Y * 3.0);
        assert_relative_eq!(perp.length(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(perp.dot(Vec3::Y), 0.0, epsilon = 1e-5);
        assert_eq!(chord_perpendicular(Vec3::ZERO), Vec3::Y);
    }
}

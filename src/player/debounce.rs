//! Debounced boolean states.
//!
//! Contact callbacks only report while shapes overlap and can skip a tick
//! during fast motion. A state tracked here turns on immediately but only
//! turns off after it went unconfirmed for a short delay.

use bevy::prelude::*;

/// A boolean that stays true until a scheduled stop fires unconfirmed.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct Debounced {
    active: bool,
    stop_at: Option<f32>,
}

impl Debounced {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_stop_pending(&self) -> bool {
        self.stop_at.is_some()
    }

    /// Marks the state true and cancels any pending stop.
    pub fn confirm(&mut self) {
        self.active = true;
        self.stop_at = None;
    }

    /// Arms a stop at `now + delay` unless one is already pending.
    pub fn schedule_stop_if_unconfirmed(&mut self, now: f32, delay: f32) {
        if self.stop_at.is_none() {
            self.stop_at = Some(now + delay);
        }
    }

    /// Fires a due stop. Returns `true` only when the state actually fell.
    pub fn update(&mut self, now: f32) -> bool {
        match self.stop_at {
            Some(deadline) if deadline <= now => {
                self.stop_at = None;
                std::mem::replace(&mut self.active, false)
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialState {
    Grounded,
    OnWall,
    Surfing,
}

impl SpatialState {
    pub const ALL: [Self; 3] = [Self::Grounded, Self::OnWall, Self::Surfing];
}

/// One [`Debounced`] per spatial state.
#[derive(Reflect, Debug, Clone, Default, PartialEq)]
pub struct SpatialTracker {
    grounded: Debounced,
    on_wall: Debounced,
    surfing: Debounced,
}

impl SpatialTracker {
    pub fn get(&self, state: SpatialState) -> &Debounced {
        match state {
            SpatialState::Grounded => &self.grounded,
            SpatialState::OnWall => &self.on_wall,
            SpatialState::Surfing => &self.surfing,
        }
    }

    fn get_mut(&mut self, state: SpatialState) -> &mut Debounced {
        match state {
            SpatialState::Grounded => &mut self.grounded,
            SpatialState::OnWall => &mut self.on_wall,
            SpatialState::Surfing => &mut self.surfing,
        }
    }

    pub fn is_active(&self, state: SpatialState) -> bool {
        self.get(state).is_active()
    }

    pub fn confirm(&mut self, state: SpatialState) {
        self.get_mut(state).confirm();
    }

    pub fn schedule_stop_if_unconfirmed(&mut self, state: SpatialState, now: f32, delay: f32) {
        self.get_mut(state).schedule_stop_if_unconfirmed(now, delay);
    }

    /// Fires due stops and returns the states that fell this call.
    pub fn update(&mut self, now: f32) -> Vec<SpatialState> {
        SpatialState::ALL
            .into_iter()
            .filter(|state| self.get_mut(*state).update(now))
            .collect()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

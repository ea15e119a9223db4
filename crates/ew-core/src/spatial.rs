use crate::math::{Rotation, Vector3};

/// Seconds a remote correction takes to blend in completely.
pub const REMOTE_BLEND_TIME: f32 = 0.1;

/// Position, orientation and motion of a single actor.
///
/// Remote duplicates (actors whose authoritative state lives on another
/// peer) receive periodic samples via [`SpatialState::set_remote`]. Between
/// samples the remote target is extrapolated by its velocity and the local
/// position blends toward it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpatialState {
    /// Current position.
    pub position: Vector3,
    /// Current rotation.
    pub rotation: Rotation,
    /// Current velocity.
    pub velocity: Vector3,
    /// Forward input in `-1.0..=1.0`.
    pub forward_fraction: f32,
    /// Strafe input in `-1.0..=1.0`.
    pub strafe_fraction: f32,
    /// Last received remote position, extrapolated each tick.
    pub remote_position: Vector3,
    /// Last received remote rotation.
    pub remote_rotation: Rotation,
    /// Last received remote velocity.
    pub remote_velocity: Vector3,
    /// Portion of the remote correction still to blend in, `0.0..=1.0`.
    pub remote_blend: f32,
}

impl SpatialState {
    /// A stationary state at the given position and rotation.
    pub fn at(position: Vector3, rotation: Rotation) -> Self {
        Self {
            position,
            rotation,
            remote_position: position,
            remote_rotation: rotation,
            ..Self::default()
        }
    }

    /// Record forward/strafe input, clamped to unit range.
    pub fn set_movement(&mut self, forward: f32, strafe: f32) {
        self.forward_fraction = forward.clamp(-1.0, 1.0);
        self.strafe_fraction = strafe.clamp(-1.0, 1.0);
    }

    /// Accept a new remote sample and restart the blend.
    pub fn set_remote(&mut self, position: Vector3, rotation: Rotation, velocity: Vector3) {
        self.remote_position = position;
        self.remote_rotation = rotation;
        self.remote_velocity = velocity;
        self.velocity = velocity;
        self.remote_blend = 1.0;
    }

    /// Whether a remote correction is still being blended in.
    pub fn is_blending(&self) -> bool {
        self.remote_blend > 0.0
    }

    /// Advance remote interpolation by `dt` seconds.
    pub fn interpolate(&mut self, dt: f32) {
        if !self.is_blending() {
            return;
        }
        self.remote_position += self.remote_velocity * dt;

        let step = (dt / REMOTE_BLEND_TIME).min(self.remote_blend);
        let t = step / self.remote_blend;
        self.position = self.position.lerp(&self.remote_position, t);
        self.rotation = self.rotation.lerp(&self.remote_rotation, t);
        self.remote_blend -= step;

        if self.remote_blend <= f32::EPSILON {
            self.remote_blend = 0.0;
            self.position = self.remote_position;
            self.rotation = self.remote_rotation;
        }
    }

    /// Snap to a location, clearing motion and any pending blend.
    pub fn respawn(&mut self, position: Vector3, rotation: Rotation) {
        *self = Self::at(position, rotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stationary_state_does_not_move() {
        let mut s = SpatialState::at(Vector3::new(1.0, 2.0, 3.0), Rotation::default());
        s.interpolate(1.0);
        assert_eq!(s.position, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn remote_sample_blends_in_over_blend_time() {
        let mut s = SpatialState::at(Vector3::ZERO, Rotation::default());
        s.set_remote(Vector3::new(10.0, 0.0, 0.0), Rotation::default(), Vector3::ZERO);

        s.interpolate(REMOTE_BLEND_TIME / 2.0);
        assert!(s.position.x > 4.0 && s.position.x < 6.0);
        assert!(s.is_blending());

        s.interpolate(REMOTE_BLEND_TIME);
        assert_eq!(s.position, Vector3::new(10.0, 0.0, 0.0));
        assert!(!s.is_blending());
    }

    #[test]
    fn remote_target_is_extrapolated_by_velocity() {
        let mut s = SpatialState::at(Vector3::ZERO, Rotation::default());
        s.set_remote(Vector3::ZERO, Rotation::default(), Vector3::new(1.0, 0.0, 0.0));
        s.interpolate(1.0);
        assert!((s.remote_position.x - 1.0).abs() < 1e-5);
        assert!((s.position.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn movement_input_is_clamped() {
        let mut s = SpatialState::default();
        s.set_movement(3.0, -4.0);
        assert_eq!(s.forward_fraction, 1.0);
        assert_eq!(s.strafe_fraction, -1.0);
    }

    #[test]
    fn respawn_clears_motion() {
        let mut s = SpatialState::default();
        s.set_remote(Vector3::new(5.0, 5.0, 5.0), Rotation::default(), Vector3::new(1.0, 1.0, 1.0));
        s.respawn(Vector3::new(1.0, 0.0, 0.0), Rotation::new(0.0, 90.0, 0.0));
        assert_eq!(s.velocity, Vector3::ZERO);
        assert!(!s.is_blending());
        assert_eq!(s.rotation.yaw, 90.0);
    }
}

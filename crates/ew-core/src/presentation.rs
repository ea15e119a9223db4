//! The seam between the simulation and the world-side actor representation.
//!
//! Rendering, physics and navigation live outside the simulation. Each
//! spawned actor may be bound to a [`Presentation`] that carries out movement
//! requests and reflects state changes. Movement requests only report whether
//! they were accepted; completion is reported back to the simulation later.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::entity::EntityId;
use crate::math::{Rotation, Vector3};

/// World-side handle for one actor.
pub trait Presentation: fmt::Debug {
    /// Mirror an authoritative position.
    fn set_position(&mut self, _position: Vector3) {}

    /// Mirror an authoritative rotation.
    fn set_rotation(&mut self, _rotation: Rotation) {}

    /// Mirror an authoritative velocity.
    fn set_velocity(&mut self, _velocity: Vector3) {}

    /// Request navigation to a point.
    fn move_to_location(&mut self, target: Vector3) -> bool;

    /// Request navigation toward another actor currently at `position`.
    fn move_to_actor(&mut self, target: EntityId, position: Vector3) -> bool;

    /// Request navigation to a random reachable point within `radius`.
    fn move_to_random_location_in_radius(&mut self, radius: f32) -> bool;

    /// Trace a line of sight and report the first actor hit.
    fn line_trace_to(&self, _target: Vector3) -> Option<EntityId> {
        None
    }

    /// A named boolean state changed value.
    fn on_update_state(&mut self, _name: &str, _value: bool) {}

    /// A one-off named event fired on this actor.
    fn on_trigger_event(&mut self, _name: &str, _source: Option<EntityId>) {}

    /// The actor is being removed from the world.
    fn remove_from_world(&mut self) {}
}

impl<P: Presentation> Presentation for Rc<RefCell<P>> {
    fn set_position(&mut self, position: Vector3) {
        self.borrow_mut().set_position(position);
    }

    fn set_rotation(&mut self, rotation: Rotation) {
        self.borrow_mut().set_rotation(rotation);
    }

    fn set_velocity(&mut self, velocity: Vector3) {
        self.borrow_mut().set_velocity(velocity);
    }

    fn move_to_location(&mut self, target: Vector3) -> bool {
        self.borrow_mut().move_to_location(target)
    }

    fn move_to_actor(&mut self, target: EntityId, position: Vector3) -> bool {
        self.borrow_mut().move_to_actor(target, position)
    }

    fn move_to_random_location_in_radius(&mut self, radius: f32) -> bool {
        self.borrow_mut().move_to_random_location_in_radius(radius)
    }

    fn line_trace_to(&self, target: Vector3) -> Option<EntityId> {
        self.borrow().line_trace_to(target)
    }

    fn on_update_state(&mut self, name: &str, value: bool) {
        self.borrow_mut().on_update_state(name, value);
    }

    fn on_trigger_event(&mut self, name: &str, source: Option<EntityId>) {
        self.borrow_mut().on_trigger_event(name, source);
    }

    fn remove_from_world(&mut self) {
        self.borrow_mut().remove_from_world();
    }
}

/// A presentation that accepts every request and records what it was asked.
///
/// Stands in for the world layer in headless runs and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresentation {
    /// Last requested destination.
    pub last_move: Option<Vector3>,
    /// Number of accepted move requests.
    pub move_requests: u32,
    /// State changes in the order they were reported.
    pub state_changes: Vec<(String, bool)>,
    /// Trigger events in the order they were reported.
    pub triggers: Vec<String>,
    /// Whether the actor was removed from the world.
    pub removed: bool,
    /// Actor reported by line traces.
    pub trace_hit: Option<EntityId>,
}

impl Presentation for RecordingPresentation {
    fn move_to_location(&mut self, target: Vector3) -> bool {
        self.last_move = Some(target);
        self.move_requests += 1;
        true
    }

    fn move_to_actor(&mut self, _target: EntityId, position: Vector3) -> bool {
        self.move_to_location(position)
    }

    fn move_to_random_location_in_radius(&mut self, radius: f32) -> bool {
        if radius <= 0.0 {
            return false;
        }
        self.move_requests += 1;
        true
    }

    fn line_trace_to(&self, _target: Vector3) -> Option<EntityId> {
        self.trace_hit
    }

    fn on_update_state(&mut self, name: &str, value: bool) {
        self.state_changes.push((name.to_string(), value));
    }

    fn on_trigger_event(&mut self, name: &str, _source: Option<EntityId>) {
        self.triggers.push(name.to_string());
    }

    fn remove_from_world(&mut self) {
        self.removed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_handle_forwards_to_inner() {
        let inner = Rc::new(RefCell::new(RecordingPresentation::default()));
        let mut handle: Box<dyn Presentation> = Box::new(inner.clone());
        assert!(handle.move_to_location(Vector3::new(1.0, 0.0, 0.0)));
        assert!(!handle.move_to_random_location_in_radius(0.0));
        handle.on_update_state("stunned", true);
        handle.remove_from_world();

        let seen = inner.borrow();
        assert_eq!(seen.move_requests, 1);
        assert_eq!(seen.last_move, Some(Vector3::new(1.0, 0.0, 0.0)));
        assert_eq!(seen.state_changes, vec![("stunned".to_string(), true)]);
        assert!(seen.removed);
    }

    #[test]
    fn line_trace_reports_configured_hit() {
        let rec = RecordingPresentation {
            trace_hit: Some(EntityId(9)),
            ..RecordingPresentation::default()
        };
        assert_eq!(rec.line_trace_to(Vector3::ZERO), Some(EntityId(9)));
    }
}

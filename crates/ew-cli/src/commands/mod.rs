pub mod check;
pub mod simulate;
pub mod talk;

use ew_core::EntityId;
use ew_simulation::World;

/// Display name for an actor id, falling back to the id itself.
fn actor_label(world: &World, id: EntityId) -> String {
    match world.actor(id) {
        Some(actor) if !actor.core().display_name().is_empty() => {
            format!("{} ({id})", actor.core().display_name())
        }
        Some(actor) => format!("{} ({id})", actor.core().blueprint_name()),
        None => id.to_string(),
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

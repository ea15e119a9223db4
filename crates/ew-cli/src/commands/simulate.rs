use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use ew_simulation::WorldEventKind;

use crate::scenario;

pub fn run(file: &Path, ticks: u64, dt: f32, seed: Option<u64>, verbose: bool) -> Result<(), String> {
    if dt.is_nan() || dt <= 0.0 {
        return Err(format!("tick length must be positive, got {dt}"));
    }
    let mut parsed = scenario::read(file)?;
    if let Some(seed) = seed {
        parsed.config.seed = seed;
    }
    let seed = parsed.config.seed;
    let mut loaded = scenario::build(parsed)?;

    for _ in 0..ticks {
        loaded.world.tick(dt);
    }
    let world = &loaded.world;

    // Header
    println!(
        "  {} '{}' {}",
        "Simulation".bold(),
        loaded.name,
        format!("({ticks} ticks, dt={dt}s, seed={seed})").dimmed()
    );
    println!(
        "  {} actor{} in world, {} events logged",
        world.actor_count(),
        super::plural(world.actor_count()),
        world.events().len()
    );
    println!("  Simulated time: {:.1}s", ticks as f32 * dt);
    println!();

    if verbose {
        println!("  {}", "Event Log".bold().underline());
        println!();
        for event in world.events().events() {
            let tick_label = format!("[tick {:>3}]", event.tick).dimmed();
            let desc = colorize_event(&event.kind, &event.description);
            println!("  {tick_label} {desc}");
        }
        if world.events().is_empty() {
            println!("  {}", "(no events)".dimmed());
        }
        println!();
    } else {
        let notable: Vec<_> = world
            .events()
            .events()
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    WorldEventKind::Killed { .. }
                        | WorldEventKind::ZoneActivated { .. }
                        | WorldEventKind::ZoneDeactivated { .. }
                )
            })
            .collect();
        let spawned = world
            .events()
            .count(|k| matches!(k, WorldEventKind::SpawnerSpawned { .. }));

        if !notable.is_empty() || spawned > 0 {
            println!("  {}", "Notable Events".bold().underline());
            for event in &notable {
                let label = match event.kind {
                    WorldEventKind::Killed { .. } => "DEATH".red().bold(),
                    _ => "ZONE ".cyan().bold(),
                };
                println!("  {label}  {}", event.description);
            }
            if spawned > 0 {
                println!(
                    "  {}  {spawned} actor{} spawned by spawners",
                    "SPAWN".green().bold(),
                    super::plural(spawned)
                );
            }
            println!();
        }
    }

    println!("  {}", "Actors".bold().underline());
    println!();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Name", "Kind", "Health", "Position"]);
    for actor in world.actors() {
        let core = actor.core();
        let kind = if actor.is_player() {
            "player"
        } else if actor.is_npc() {
            "npc"
        } else {
            "creature"
        };
        let health = format!("{}/{}", core.health(), core.max_health());
        let health = if core.is_alive() {
            health
        } else {
            health.red().to_string()
        };
        let pos = core.position();
        table.add_row(vec![
            actor.id().to_string(),
            core.display_name().to_string(),
            kind.to_string(),
            health,
            format!("{:.1}, {:.1}, {:.1}", pos.x, pos.y, pos.z),
        ]);
    }
    println!("{table}");
    println!();

    if !world.spawners().is_empty() {
        println!("  {}", "Spawners".bold().underline());
        println!();
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Zone", "Active", "Population", "Next Spawn"]);
        for spawner in world.spawners() {
            let active = world.zone(spawner.zone()).is_some_and(|z| z.is_active());
            table.add_row(vec![
                spawner.zone().to_string(),
                if active { "yes" } else { "no" }.to_string(),
                format!("{}/{}", spawner.population(), spawner.max_actors()),
                format!("{:.1}s", spawner.timer()),
            ]);
        }
        println!("{table}");
        println!();
    }

    Ok(())
}

fn colorize_event(kind: &WorldEventKind, description: &str) -> colored::ColoredString {
    match kind {
        WorldEventKind::Killed { .. } => description.red().bold(),
        WorldEventKind::Damaged { .. } => description.red(),
        WorldEventKind::Spawned { .. } | WorldEventKind::SpawnerSpawned { .. } => {
            description.green()
        }
        WorldEventKind::Respawned { .. } => description.green().bold(),
        WorldEventKind::Destroyed { .. } => description.dimmed(),
        WorldEventKind::ZoneActivated { .. } | WorldEventKind::ZoneDeactivated { .. } => {
            description.cyan()
        }
        WorldEventKind::ConversationStarted { .. } | WorldEventKind::ConversationEnded { .. } => {
            description.blue()
        }
        WorldEventKind::RegionChangeRequested { .. } => description.yellow(),
        WorldEventKind::Chat { .. } => description.normal(),
    }
}

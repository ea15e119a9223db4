use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use crate::scenario;

pub fn run(file: &Path) -> Result<(), String> {
    let loaded = scenario::load(file)?;
    let world = &loaded.world;
    let catalog = world.catalog();

    println!("  All checks passed for '{}'.", loaded.name);
    println!(
        "  {} item{}, {} quest{}, {} npc{}, {} zone{}, {} spawner{}, {} player{}",
        catalog.item_count(),
        super::plural(catalog.item_count()),
        catalog.quest_count(),
        super::plural(catalog.quest_count()),
        loaded.npcs.len(),
        super::plural(loaded.npcs.len()),
        world.zones().count(),
        super::plural(world.zones().count()),
        world.spawners().len(),
        super::plural(world.spawners().len()),
        loaded.players.len(),
        super::plural(loaded.players.len()),
    );

    if loaded.npcs.is_empty() {
        return Ok(());
    }

    println!();
    println!("  {}", "Dialogue".bold().underline());
    println!();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["NPC", "States", "Entry", "Shop"]);
    for id in loaded.npcs.values() {
        let Some(npc) = world.actor(*id).and_then(|a| a.as_npc()) else {
            continue;
        };
        let dialogue = npc.dialogue();
        let shop: Vec<&str> = npc
            .behavior()
            .shop_items()
            .iter()
            .map(|item| item.name())
            .collect();
        table.add_row(vec![
            npc.name().to_string(),
            dialogue.len().to_string(),
            dialogue.initial_state().unwrap_or("--").to_string(),
            if shop.is_empty() {
                "--".to_string()
            } else {
                shop.join(", ")
            },
        ]);
    }
    println!("{table}");

    Ok(())
}

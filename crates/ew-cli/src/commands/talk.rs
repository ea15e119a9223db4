use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use ew_core::EntityId;
use ew_simulation::{QuestProgress, SessionEvent, World};

use crate::scenario;

pub fn run(file: &Path, npc: &str, player: Option<&str>, choices: &[String]) -> Result<(), String> {
    let mut loaded = scenario::load(file)?;
    let npc = loaded.npc(npc)?;
    let player = loaded.player(player)?;
    let world = &mut loaded.world;

    // Drop whatever the initial state setup queued.
    session(world, player)?.drain_events();

    world
        .start_conversation(player, npc)
        .map_err(|e| e.to_string())?;
    println!(
        "  {} {} and {}",
        "Conversation".bold(),
        super::actor_label(world, player),
        super::actor_label(world, npc)
    );
    println!();
    let mut open = print_events(world, player)?;

    for label in choices {
        if !open {
            return Err(format!("cannot choose '{label}': the conversation has ended"));
        }
        println!("  {} {}", ">".bold(), label.cyan());
        world
            .transition_to_npc_state(player, label)
            .map_err(|e| e.to_string())?;
        open = print_events(world, player)?;
    }

    if !open {
        println!("  {}", "Conversation ended.".dimmed());
        println!();
    }

    let sheet = session(world, player)?;
    let mut quests = Table::new();
    quests.set_content_arrangement(ContentArrangement::Dynamic);
    quests.set_header(vec!["Quest", "Progress"]);
    for (quest, progress) in sheet.quests().iter() {
        let progress = match progress {
            QuestProgress::NotStarted => "not started".to_string(),
            QuestProgress::InProgress { state, count } => format!("{state} ({count})"),
            QuestProgress::Completed => "completed".green().to_string(),
        };
        quests.add_row(vec![quest.name().to_string(), progress]);
    }
    println!("  {}", "Quests".bold().underline());
    println!();
    println!("{quests}");
    println!();

    let mut items = Table::new();
    items.set_content_arrangement(ContentArrangement::Dynamic);
    items.set_header(vec!["Item", "Count"]);
    for stack in sheet.items() {
        items.add_row(vec![stack.item.name().to_string(), stack.count.to_string()]);
    }
    println!("  {}", "Inventory".bold().underline());
    println!();
    println!("{items}");

    Ok(())
}

fn session(world: &mut World, player: EntityId) -> Result<&mut ew_simulation::Player, String> {
    world
        .player_mut(player)
        .ok_or_else(|| format!("{player} is not a player"))
}

/// Print the dialogue-relevant events queued for the player. Returns whether
/// the conversation is still open.
fn print_events(world: &mut World, player: EntityId) -> Result<bool, String> {
    let session = session(world, player)?;
    for event in session.drain_events() {
        match event {
            SessionEvent::DialogueState {
                state,
                text,
                choices,
                ..
            } => {
                println!("  {} {text}", format!("[{state}]").dimmed());
                for choice in choices {
                    println!("    - {choice}");
                }
                println!();
            }
            SessionEvent::ShopOpened { .. } => {
                println!("  {}", "SHOP".yellow().bold());
                println!();
            }
            SessionEvent::NewItem { item, count } => {
                println!("  {}  {count} x {item}", "ITEM".green().bold());
            }
            SessionEvent::QuestStarted { quest, state } => {
                println!("  {}  {quest} started at {state}", "QUEST".blue().bold());
            }
            SessionEvent::QuestProgress { quest, state, .. } => {
                println!("  {}  {quest} is now at {state}", "QUEST".blue().bold());
            }
            SessionEvent::QuestCompleted { quest } => {
                println!("  {}  {quest} completed", "QUEST".green().bold());
            }
            SessionEvent::Achievement { name } => {
                println!("  {}  {name}", "ACHIEVED".magenta().bold());
            }
            _ => {}
        }
    }
    Ok(session.conversation().is_some())
}

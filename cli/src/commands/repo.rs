//! Repository inspection and maintenance commands.

use serde::Serialize;
use statekeep_core::api as core_api;
use statekeep_core::api::{AppStateMemento, MementoRepository};
use std::sync::Arc;

use crate::commands::cli::{ClearArgs, IdArgs};

async fn open(
    ctx: &core_api::AppContext,
) -> Result<Arc<dyn MementoRepository>, core_api::CliError> {
    let repo = ctx.repository();
    repo.initialize().await?;
    Ok(repo)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), core_api::CliError> {
    let s = serde_json::to_string_pretty(value)
        .map_err(|e| core_api::CliError::Command(format!("encode output: {e}")))?;
    println!("{s}");
    Ok(())
}

pub fn summary_line(m: &AppStateMemento) -> String {
    format!(
        "{}  {}  {:<9}  originator={}  route={}",
        m.id,
        m.timestamp.to_rfc3339(),
        m.lifecycle_state.as_str(),
        m.originator_id,
        m.current_route.as_deref().unwrap_or("-"),
    )
}

pub async fn handle_stats(
    ctx: &core_api::AppContext,
    json: bool,
) -> Result<(), core_api::CliError> {
    let stats = open(ctx).await?.get_statistics().await?;
    if json {
        return print_json(&stats);
    }

    println!("repository:       {}", ctx.repository().name());
    println!("mementos:         {}", stats.total_mementos);
    println!("compressed:       {}", stats.compressed_count);
    println!("total size:       {} bytes", stats.total_size_bytes);
    if let (Some(oldest), Some(newest)) = (stats.oldest_timestamp, stats.newest_timestamp) {
        println!("oldest:           {}", oldest.to_rfc3339());
        println!("newest:           {}", newest.to_rfc3339());
        println!("average age:      {:.1}s", stats.average_age_secs);
    }
    for (originator, count) in &stats.originator_counts {
        println!("  by {originator}: {count}");
    }
    Ok(())
}

pub async fn handle_list(ctx: &core_api::AppContext, json: bool) -> Result<(), core_api::CliError> {
    let all = open(ctx).await?.get_all_mementos().await?;
    if json {
        return print_json(&all);
    }
    if all.is_empty() {
        println!("no mementos stored");
    }
    for m in &all {
        println!("{}", summary_line(m));
    }
    Ok(())
}

pub async fn handle_latest(
    ctx: &core_api::AppContext,
    json: bool,
) -> Result<i32, core_api::CliError> {
    match open(ctx).await?.get_latest_memento().await? {
        Some(m) => {
            print_memento(&m, json)?;
            Ok(0)
        }
        None => {
            eprintln!("no mementos stored");
            Ok(1)
        }
    }
}

pub async fn handle_show(
    args: IdArgs,
    ctx: &core_api::AppContext,
    json: bool,
) -> Result<i32, core_api::CliError> {
    match open(ctx).await?.get_memento_by_id(&args.id).await? {
        Some(m) => {
            print_memento(&m, json)?;
            Ok(0)
        }
        None => {
            eprintln!("memento not found: {}", args.id);
            Ok(1)
        }
    }
}

pub async fn handle_delete(
    args: IdArgs,
    ctx: &core_api::AppContext,
) -> Result<i32, core_api::CliError> {
    if open(ctx).await?.delete_memento(&args.id).await? {
        println!("deleted {}", args.id);
        Ok(0)
    } else {
        eprintln!("memento not found: {}", args.id);
        Ok(1)
    }
}

pub async fn handle_clear(
    args: ClearArgs,
    ctx: &core_api::AppContext,
) -> Result<(), core_api::CliError> {
    if !args.yes {
        return Err(core_api::CliError::Command(
            "refusing to clear without --yes".to_string(),
        ));
    }
    let removed = open(ctx).await?.clear_all_mementos().await?;
    println!("removed {removed} memento(s)");
    Ok(())
}

fn print_memento(m: &AppStateMemento, json: bool) -> Result<(), core_api::CliError> {
    if json {
        return print_json(m);
    }
    println!("{}", summary_line(m));
    if !m.navigation_stack.is_empty() {
        println!("  navigation: {}", m.navigation_stack.join(" > "));
    }
    let sections = [
        ("userSession", &m.user_session),
        ("uiState", &m.ui_state),
        ("patternStates", &m.pattern_states),
        ("appConfig", &m.app_config),
        ("backgroundTasks", &m.background_tasks),
        ("networkStates", &m.network_states),
        ("animationStates", &m.animation_states),
        ("firebaseState", &m.firebase_state),
        ("localizationState", &m.localization_state),
    ];
    for (name, map) in sections {
        if !map.is_empty() {
            println!("  {name}: {}", serde_json::Value::Object(map.clone()));
        }
    }
    if let Some(game) = m.game_state.as_ref().filter(|g| !g.is_empty()) {
        println!("  gameState: {}", serde_json::Value::Object(game.clone()));
    }
    for (name, slice) in &m.custom_states {
        println!("  {name}: {}", serde_json::Value::Object(slice.clone()));
    }
    Ok(())
}

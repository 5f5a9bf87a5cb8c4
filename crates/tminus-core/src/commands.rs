mod modifiers;
mod pick;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::cli::Invocation;
use crate::config::Config;
use crate::datastore::DataStore;
use crate::datetime::{default_target, format_project_datetime};
use crate::event::{Category, Event, Note, THEME_PALETTE};
use crate::render::Renderer;

use self::modifiers::{Mod, apply_mods, parse_mods, parse_name_and_mods};
pub use self::pick::{Gesture, PickerSettings, parse_gestures, run_gestures};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "list", "info", "modify", "delete", "note", "pick", "push", "show", "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let command = inv.command.as_str();
    let args = inv.command_args.as_slice();

    debug!(command, args = ?args, "dispatching command");

    match command {
        "add" => cmd_add(store, cfg, args, now),
        "list" => cmd_list(store, cfg, renderer, args, now),
        "info" => cmd_info(store, renderer, args, now),
        "modify" => cmd_modify(store, args, now),
        "delete" => cmd_delete(store, args),
        "note" => cmd_note(store, args, now),
        "pick" => pick::cmd_pick(store, cfg, renderer, args, now),
        "push" => cmd_push(store),
        "show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("tminus {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn ensure_future(target: DateTime<Utc>, now: DateTime<Utc>) -> anyhow::Result<()> {
    if target <= now {
        return Err(anyhow!(
            "target {} is in the past",
            format_project_datetime(target)
        ));
    }
    Ok(())
}

fn load_event(store: &DataStore, token: &str) -> anyhow::Result<Event> {
    let id = store.resolve_id(token)?;
    store
        .get(id)?
        .ok_or_else(|| anyhow!("no event with id {id}"))
}

#[instrument(skip(store, cfg, args, now))]
fn cmd_add(
    store: &mut DataStore,
    cfg: &Config,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    let (name, mods) = parse_name_and_mods(args, now)?;
    let hour = cfg.get_parsed::<u32>("event.default_hour")?.unwrap_or(8);
    let mut event = Event::new(name, default_target(now, hour)?, now);
    apply_mods(&mut event, &mods)?;
    ensure_future(event.target, now)?;

    let events = store.set(event.clone())?;
    debug!(event_count = events.len(), "event added");
    println!(
        "Created event {} '{}' for {}.",
        event.short_id(),
        event.name,
        format_project_datetime(event.target)
    );
    Ok(())
}

#[instrument(skip(store, cfg, renderer, args, now))]
fn cmd_list(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command list");

    let category = match args.first() {
        Some(arg) => {
            let raw = arg
                .strip_prefix("category:")
                .or_else(|| arg.strip_prefix("cat:"))
                .unwrap_or(arg);
            Some(raw.parse::<Category>()?)
        }
        None => None,
    };

    let mut events: Vec<Event> = store
        .load_events()?
        .into_iter()
        .filter(|event| category.is_none_or(|c| event.category == c))
        .collect();
    events.sort_by_key(|event| event.target);

    if events.is_empty() {
        println!("No events.");
        return Ok(());
    }

    let urgent_days = cfg.get_parsed::<i64>("urgent.days")?.unwrap_or(3);
    renderer.print_event_table(&events, now, urgent_days)?;
    Ok(())
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_info(
    store: &mut DataStore,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command info");

    if args.is_empty() {
        return Err(anyhow!("info: event id is required"));
    }

    for (idx, token) in args.iter().enumerate() {
        if idx > 0 {
            println!();
        }
        let event = load_event(store, token)?;
        renderer.print_event_info(&event, now)?;
    }

    Ok(())
}

#[instrument(skip(store, args, now))]
fn cmd_modify(store: &mut DataStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command modify");

    let (token, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("modify: event id is required"))?;
    let mut event = load_event(store, token)?;

    let mods = parse_mods(rest, now)?;
    if mods.is_empty() {
        return Err(anyhow!("modify: nothing to change"));
    }

    apply_mods(&mut event, &mods)?;
    if mods.iter().any(|m| matches!(m, Mod::Target(_))) {
        ensure_future(event.target, now)?;
    }
    event.modified = Some(now);
    store.set(event.clone())?;

    println!("Modified event {}.", event.short_id());
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_delete(store: &mut DataStore, args: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    if args.is_empty() {
        return Err(anyhow!("delete: event id is required"));
    }

    let mut deleted = 0_u64;
    for token in args {
        let id = store.resolve_id(token)?;
        if store.delete(id)? {
            deleted += 1;
        } else {
            warn!(id = %id, "no stored event to delete");
        }
    }

    println!("Deleted {deleted} event(s).");
    Ok(())
}

/// `note <id> add <text...>`, `note <id> toggle <n>`, `note <id> remove <n>`.
/// Note numbers are 1-based as shown by `info`.
#[instrument(skip(store, args, now))]
fn cmd_note(store: &mut DataStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command note");

    let [token, action, rest @ ..] = args else {
        return Err(anyhow!("usage: note <id> add|toggle|remove ..."));
    };
    let mut event = load_event(store, token)?;

    match action.as_str() {
        "add" => {
            let content = rest.join(" ");
            if content.trim().is_empty() {
                return Err(anyhow!("note text cannot be empty"));
            }
            event.notes.push(Note::new(content));
            println!("Added note {} to {}.", event.notes.len(), event.short_id());
        }
        "toggle" => {
            let idx = note_index(&event, rest)?;
            let note = &mut event.notes[idx];
            note.completed = !note.completed;
            let state = if note.completed { "done" } else { "open" };
            println!("Note {} is now {state}.", idx + 1);
        }
        "remove" => {
            let idx = note_index(&event, rest)?;
            let removed = event.notes.remove(idx);
            println!("Removed note '{}'.", removed.content);
        }
        other => return Err(anyhow!("unknown note action: {other}")),
    }

    event.modified = Some(now);
    store.set(event)?;
    Ok(())
}

fn note_index(event: &Event, rest: &[String]) -> anyhow::Result<usize> {
    let raw = rest
        .first()
        .ok_or_else(|| anyhow!("note number is required"))?;
    let number: usize = raw
        .parse()
        .map_err(|_| anyhow!("invalid note number: {raw}"))?;
    if number == 0 || number > event.notes.len() {
        return Err(anyhow!(
            "note {number} does not exist ({} note(s))",
            event.notes.len()
        ));
    }
    Ok(number - 1)
}

fn cmd_push(store: &mut DataStore) -> anyhow::Result<()> {
    let enabled = store.toggle_push()?;
    let state = if enabled { "on" } else { "off" };
    println!("Push notifications {state}.");
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    let mut entries: Vec<_> = cfg.iter().collect();
    entries.sort();
    for (k, v) in entries {
        println!("{k}={v}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("Commands: {}", known_command_names().join(", "));
    println!(
        "Modifiers: name:TEXT date:EXPR category:personal|work|trip|other color:#HEX desc:TEXT"
    );
    println!("Dates: now, today, tomorrow, YYYY-MM-DD, YYYY-MM-DDTHH:MM, HH:MM, +N[m|h|d|w]");
    println!("Picker: <day|month|year|hour|minute>:press|release|scroll=PX|tap=N, wait=MS");
    println!("Palette: {}", THEME_PALETTE.join(" "));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{expand_command_abbrev, known_command_names};

    #[test]
    fn abbreviations_must_be_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("a", &known), Some("add"));
        assert_eq!(expand_command_abbrev("pu", &known), Some("push"));
        assert_eq!(expand_command_abbrev("p", &known), None);
        assert_eq!(expand_command_abbrev("show", &known), Some("show"));
        assert_eq!(expand_command_abbrev("zzz", &known), None);
    }
}

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{instrument, warn};

use crate::datetime::parse_date_expr;
use crate::event::{Category, Event, parse_theme_color};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Mod {
    Name(String),
    Target(DateTime<Utc>),
    Category(Category),
    Color(String),
    Description(String),
}

/// Split `add` arguments into the event name and `key:value` modifiers.
/// Everything after a bare `--` is part of the name.
#[instrument(skip(args, now))]
pub(crate) fn parse_name_and_mods(
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<(String, Vec<Mod>)> {
    let mut name_parts = Vec::new();
    let mut mods = Vec::new();

    let mut literal = false;
    for arg in args {
        if arg == "--" {
            literal = true;
            continue;
        }

        if !literal && let Some(one_mod) = parse_one_mod(arg, now)? {
            mods.push(one_mod);
            continue;
        }

        name_parts.push(arg.clone());
    }

    let name = name_parts.join(" ");
    if name.trim().is_empty() {
        return Err(anyhow!("add: event name is required"));
    }

    Ok((name, mods))
}

#[instrument(skip(args, now))]
pub(crate) fn parse_mods(args: &[String], now: DateTime<Utc>) -> anyhow::Result<Vec<Mod>> {
    let mut mods = Vec::new();
    for arg in args {
        if let Some(one_mod) = parse_one_mod(arg, now)? {
            mods.push(one_mod);
        } else {
            warn!(arg = %arg, "unrecognized modifier token ignored");
        }
    }
    Ok(mods)
}

fn parse_one_mod(tok: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Mod>> {
    let Some((key, value)) = tok.split_once(':') else {
        return Ok(None);
    };

    match key.to_ascii_lowercase().as_str() {
        "name" => Ok(Some(Mod::Name(value.to_string()))),
        "date" | "target" => Ok(Some(Mod::Target(parse_date_expr(value, now)?))),
        "cat" | "category" => Ok(Some(Mod::Category(value.parse()?))),
        "color" => Ok(Some(Mod::Color(parse_theme_color(value)?))),
        "desc" | "description" => Ok(Some(Mod::Description(value.to_string()))),
        _ => Ok(None),
    }
}

pub(crate) fn apply_mods(event: &mut Event, mods: &[Mod]) -> anyhow::Result<()> {
    for one_mod in mods {
        match one_mod {
            Mod::Name(name) => {
                if name.trim().is_empty() {
                    return Err(anyhow!("event name cannot be empty"));
                }
                event.name = name.clone();
            }
            Mod::Target(target) => {
                event.target = *target;
            }
            Mod::Category(category) => {
                event.category = *category;
            }
            Mod::Color(color) => {
                event.theme_color = color.clone();
            }
            Mod::Description(description) => {
                event.description = description.clone();
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Mod, apply_mods, parse_mods, parse_name_and_mods};
    use crate::event::{Category, Event};

    #[test]
    fn name_words_and_modifiers_split() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 17, 12, 0, 0)
            .single()
            .expect("valid now");
        let args: Vec<String> = ["Tokyo", "cat:trip", "Trip", "color:#9fddff", "--", "desc:x"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let (name, mods) = parse_name_and_mods(&args, now).expect("parse");
        assert_eq!(name, "Tokyo Trip desc:x");
        assert_eq!(
            mods,
            vec![
                Mod::Category(Category::Trip),
                Mod::Color("#9FDDFF".to_string())
            ]
        );

        let mut event = Event::new(name, now, now);
        apply_mods(&mut event, &mods).expect("apply");
        assert_eq!(event.category, Category::Trip);
        assert_eq!(event.theme_color, "#9FDDFF");
    }

    #[test]
    fn rejects_missing_name_and_bad_values() {
        let now = Utc::now();
        assert!(parse_name_and_mods(&["cat:work".to_string()], now).is_err());
        assert!(parse_mods(&["cat:holiday".to_string()], now).is_err());
        assert!(parse_mods(&["date:someday".to_string()], now).is_err());
        assert_eq!(
            parse_mods(&["pinned:yes".to_string()], now).expect("ignored"),
            vec![]
        );
    }
}

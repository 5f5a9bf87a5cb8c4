use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::datastore::DataStore;
use crate::datetime::{format_project_datetime, to_project_local, to_utc_from_project_local};
use crate::picker::{
    ColumnEvent, CompositePicker, DEFAULT_PITCH, DEFAULT_SETTLE_DELAY, DEFAULT_VISIBLE,
    DEFAULT_YEAR_SPAN, Field, Geometry, YearWindow,
};
use crate::render::Renderer;

/// Picker tuning read from `picker.*` config keys.
#[derive(Debug, Clone, Copy)]
pub struct PickerSettings {
    pub geometry: Geometry,
    pub year_span: u32,
    pub settle_delay: Duration,
}

impl Default for PickerSettings {
    fn default() -> Self {
        Self {
            geometry: Geometry::default(),
            year_span: DEFAULT_YEAR_SPAN,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl PickerSettings {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let pitch = cfg
            .get_parsed::<f32>("picker.pitch")?
            .unwrap_or(DEFAULT_PITCH);
        let visible = cfg
            .get_parsed::<usize>("picker.visible")?
            .unwrap_or(DEFAULT_VISIBLE);
        let year_span = cfg
            .get_parsed::<u32>("picker.years")?
            .unwrap_or(DEFAULT_YEAR_SPAN);
        let settle_delay = cfg
            .get_parsed::<u64>("picker.settle_ms")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_SETTLE_DELAY);

        Ok(Self {
            geometry: Geometry::new(pitch, visible).context("invalid picker geometry")?,
            year_span,
            settle_delay,
        })
    }

    /// Picker over `value`, with the year window starting at `first_year`.
    pub fn build(&self, value: NaiveDateTime, first_year: i32) -> anyhow::Result<CompositePicker> {
        CompositePicker::new(
            value,
            YearWindow::new(first_year, self.year_span),
            self.geometry,
            self.settle_delay,
        )
    }
}

/// One scripted input step for `pick`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Column(Field, ColumnEvent),
    Wait(Duration),
}

impl FromStr for Gesture {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(ms) = s.strip_prefix("wait=") {
            let ms: u64 = ms
                .parse()
                .map_err(|_| anyhow!("invalid wait duration: {ms}"))?;
            return Ok(Gesture::Wait(Duration::from_millis(ms)));
        }

        let (field, action) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("expected <column>:<action>, got: {s}"))?;
        let field: Field = field.parse()?;

        let event = match action.split_once('=') {
            None if action == "press" => ColumnEvent::Press,
            None if action == "release" => ColumnEvent::Release,
            Some(("scroll", px)) => {
                let px: f32 = px
                    .parse()
                    .map_err(|_| anyhow!("invalid scroll offset: {px}"))?;
                if !px.is_finite() {
                    return Err(anyhow!("invalid scroll offset: {px}"));
                }
                ColumnEvent::Scroll(px)
            }
            Some(("tap", index)) => {
                let index: usize = index
                    .parse()
                    .map_err(|_| anyhow!("invalid tap index: {index}"))?;
                ColumnEvent::Tap(index)
            }
            _ => return Err(anyhow!("unknown picker action: {action}")),
        };

        Ok(Gesture::Column(field, event))
    }
}

pub fn parse_gestures(args: &[String]) -> anyhow::Result<Vec<Gesture>> {
    args.iter().map(|arg| arg.parse()).collect()
}

/// Feed `gestures` to the picker on a virtual clock starting at `start`.
/// Due taps fire after every step; once the script ends the clock moves
/// past the settle delay so trailing taps land too. Returns every
/// composite value committed along the way.
#[instrument(skip(picker, gestures, start))]
pub fn run_gestures(
    picker: &mut CompositePicker,
    gestures: &[Gesture],
    start: Instant,
    settle_delay: Duration,
) -> Vec<NaiveDateTime> {
    let mut now = start;
    let mut changes = Vec::new();

    for gesture in gestures {
        match *gesture {
            Gesture::Column(field, event) => {
                debug!(field = %field, ?event, "gesture");
                changes.extend(picker.handle(field, event, now));
            }
            Gesture::Wait(delay) => {
                now += delay;
            }
        }
        changes.extend(picker.poll(now));
    }

    if picker.has_pending_commits() {
        now += settle_delay;
        changes.extend(picker.poll(now));
    }

    changes
}

#[instrument(skip(store, cfg, renderer, args, now))]
pub(crate) fn cmd_pick(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command pick");

    let (id_token, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("pick: event id is required"))?;
    let id = store.resolve_id(id_token)?;
    let mut event = store
        .get(id)?
        .ok_or_else(|| anyhow!("no event with id {id}"))?;

    let gestures = parse_gestures(rest)?;
    let settings = PickerSettings::from_config(cfg)?;
    let mut picker = settings.build(to_project_local(event.target), to_project_local(now).year())?;

    let changes = run_gestures(&mut picker, &gestures, Instant::now(), settings.settle_delay);
    renderer.print_picker(&picker.view())?;

    if changes.is_empty() {
        println!("No change to '{}'.", event.name);
        return Ok(());
    }

    let target = to_utc_from_project_local(picker.value(), "pick")?;
    if target <= now {
        return Err(anyhow!(
            "target {} is in the past",
            format_project_datetime(target)
        ));
    }

    event.target = target;
    event.modified = Some(now);
    store.set(event.clone())?;

    debug!(commits = changes.len(), "picker committed");
    println!(
        "Target of '{}' set to {}.",
        event.name,
        format_project_datetime(target)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use chrono::NaiveDateTime;

    use super::{Gesture, PickerSettings, parse_gestures, run_gestures};
    use crate::config::Config;
    use crate::picker::{ColumnEvent, Field};

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").expect("valid datetime")
    }

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn gesture_grammar() {
        let parsed = parse_gestures(&args(&[
            "day:press",
            "month:scroll=96.5",
            "y:release",
            "min:tap=4",
            "wait=150",
        ]))
        .expect("parse");

        assert_eq!(
            parsed,
            vec![
                Gesture::Column(Field::Day, ColumnEvent::Press),
                Gesture::Column(Field::Month, ColumnEvent::Scroll(96.5)),
                Gesture::Column(Field::Year, ColumnEvent::Release),
                Gesture::Column(Field::Minute, ColumnEvent::Tap(4)),
                Gesture::Wait(Duration::from_millis(150)),
            ]
        );

        assert!("day".parse::<Gesture>().is_err());
        assert!("week:press".parse::<Gesture>().is_err());
        assert!("hour:fling".parse::<Gesture>().is_err());
        assert!("hour:scroll=NaN".parse::<Gesture>().is_err());
        assert!("wait=soon".parse::<Gesture>().is_err());
    }

    #[test]
    fn drag_commits_on_release_and_tap_after_settle() {
        let settings = PickerSettings::default();
        let mut picker = settings
            .build(dt("2026-03-15 09:30"), 2026)
            .expect("picker");

        let gestures = parse_gestures(&args(&[
            "day:press",
            "day:scroll=960",
            "day:release",
            "hour:tap=17",
        ]))
        .expect("parse");
        let changes = run_gestures(
            &mut picker,
            &gestures,
            Instant::now(),
            settings.settle_delay,
        );

        assert_eq!(changes, vec![dt("2026-03-21 09:30"), dt("2026-03-21 17:30")]);
        assert_eq!(picker.value(), dt("2026-03-21 17:30"));
        assert!(!picker.has_pending_commits());
    }

    #[test]
    fn later_tap_in_same_column_wins() {
        let settings = PickerSettings::default();
        let mut picker = settings
            .build(dt("2026-03-15 09:30"), 2026)
            .expect("picker");

        let gestures = parse_gestures(&args(&["minute:tap=5", "wait=50", "minute:tap=45"]))
            .expect("parse");
        let changes = run_gestures(
            &mut picker,
            &gestures,
            Instant::now(),
            settings.settle_delay,
        );

        assert_eq!(changes, vec![dt("2026-03-15 09:45")]);
    }

    #[test]
    fn month_tap_lands_after_day_rolls_the_month() {
        let settings = PickerSettings::default();
        let mut picker = settings
            .build(dt("2026-02-03 10:00"), 2026)
            .expect("picker");

        let gestures = parse_gestures(&args(&["day:tap=30", "month:tap=5"])).expect("parse");
        let changes = run_gestures(
            &mut picker,
            &gestures,
            Instant::now(),
            settings.settle_delay,
        );

        assert_eq!(changes, vec![dt("2026-03-03 10:00"), dt("2026-06-03 10:00")]);
        assert_eq!(picker.value(), dt("2026-06-03 10:00"));
    }

    #[test]
    fn settings_follow_config() {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![
            ("picker.settle_ms".to_string(), "350".to_string()),
            ("picker.visible".to_string(), "5".to_string()),
        ]);
        let settings = PickerSettings::from_config(&cfg).expect("settings");
        assert_eq!(settings.settle_delay, Duration::from_millis(350));
        assert_eq!(settings.geometry.visible(), 5);
        assert_eq!(settings.year_span, 10);

        cfg.apply_overrides(vec![("picker.visible".to_string(), "4".to_string())]);
        assert!(PickerSettings::from_config(&cfg).is_err());
    }
}

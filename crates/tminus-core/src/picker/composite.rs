use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::{debug, info, warn};

use super::column::{ColumnEvent, ColumnSpec, ColumnView, Geometry, ScrollColumn};
use crate::datetime::{
    with_day_rollover, with_hour_rollover, with_minute_rollover, with_month_rollover,
    with_year_rollover,
};

pub const DEFAULT_YEAR_SPAN: u32 = 10;

/// One field of the composite date-time, in on-screen column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Day,
    Month,
    Year,
    Hour,
    Minute,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Day,
        Field::Month,
        Field::Year,
        Field::Hour,
        Field::Minute,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Day => "day",
            Field::Month => "month",
            Field::Year => "year",
            Field::Hour => "hour",
            Field::Minute => "minute",
        }
    }

    /// Column heading.
    pub fn heading(self) -> &'static str {
        match self {
            Field::Day => "Day",
            Field::Month => "Month",
            Field::Year => "Year",
            Field::Hour => "Hour",
            Field::Minute => "Min",
        }
    }

    fn position(self) -> usize {
        match self {
            Field::Day => 0,
            Field::Month => 1,
            Field::Year => 2,
            Field::Hour => 3,
            Field::Minute => 4,
        }
    }

    /// Selectable labels. Days are always 01-31 regardless of month.
    pub fn items(self, years: YearWindow) -> Vec<String> {
        match self {
            Field::Day => padded(1..=31),
            Field::Month => padded(1..=12),
            Field::Year => years.years().map(|year| year.to_string()).collect(),
            Field::Hour => padded(0..=23),
            Field::Minute => padded(0..=59),
        }
    }

    pub fn display(self, dt: NaiveDateTime) -> String {
        match self {
            Field::Day => format!("{:02}", dt.day()),
            Field::Month => format!("{:02}", dt.month()),
            Field::Year => dt.year().to_string(),
            Field::Hour => format!("{:02}", dt.hour()),
            Field::Minute => format!("{:02}", dt.minute()),
        }
    }

    /// Copy of `dt` with only this field replaced, using calendar rollover
    /// for days that do not exist in the resulting month.
    pub fn apply(self, dt: NaiveDateTime, value: u32) -> Option<NaiveDateTime> {
        match self {
            Field::Day => with_day_rollover(dt, value),
            Field::Month => with_month_rollover(dt, value),
            Field::Year => with_year_rollover(dt, i32::try_from(value).ok()?),
            Field::Hour => with_hour_rollover(dt, value),
            Field::Minute => with_minute_rollover(dt, value),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "d" => Ok(Field::Day),
            "month" | "mon" => Ok(Field::Month),
            "year" | "y" => Ok(Field::Year),
            "hour" | "h" => Ok(Field::Hour),
            "minute" | "min" => Ok(Field::Minute),
            other => Err(anyhow!(
                "unknown picker column: {other} (expected day, month, year, hour or minute)"
            )),
        }
    }
}

fn padded(range: std::ops::RangeInclusive<u32>) -> Vec<String> {
    range.map(|n| format!("{n:02}")).collect()
}

/// Contiguous run of selectable years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    first: i32,
    span: u32,
}

impl YearWindow {
    /// A window always holds at least one year.
    pub fn new(first: i32, span: u32) -> Self {
        Self {
            first,
            span: span.max(1),
        }
    }

    pub fn first(&self) -> i32 {
        self.first
    }

    pub fn span(&self) -> u32 {
        self.span
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        let first = self.first;
        (0..self.span).filter_map(move |offset| first.checked_add(i32::try_from(offset).ok()?))
    }

    pub fn contains(&self, year: i32) -> bool {
        self.years().any(|candidate| candidate == year)
    }
}

/// Display strings of every field of a composite value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLabels {
    pub day: String,
    pub month: String,
    pub year: String,
    pub hour: String,
    pub minute: String,
}

impl FieldLabels {
    pub fn derive(dt: NaiveDateTime) -> Self {
        Self {
            day: Field::Day.display(dt),
            month: Field::Month.display(dt),
            year: Field::Year.display(dt),
            hour: Field::Hour.display(dt),
            minute: Field::Minute.display(dt),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Day => &self.day,
            Field::Month => &self.month,
            Field::Year => &self.year,
            Field::Hour => &self.hour,
            Field::Minute => &self.minute,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickerView {
    pub columns: Vec<(Field, ColumnView)>,
}

/// Five wheels editing one date-time.
///
/// Every column commit produces a new composite value, which is pushed
/// back into all columns before it is returned to the caller.
#[derive(Debug, Clone)]
pub struct CompositePicker {
    value: NaiveDateTime,
    years: YearWindow,
    columns: Vec<ScrollColumn>,
}

impl CompositePicker {
    pub fn new(
        value: NaiveDateTime,
        years: YearWindow,
        geometry: Geometry,
        settle_delay: Duration,
    ) -> anyhow::Result<Self> {
        let labels = FieldLabels::derive(value);
        let mut columns = Vec::with_capacity(Field::ALL.len());
        for field in Field::ALL {
            let spec = ColumnSpec::new(field.items(years), geometry)?.with_label(field.heading());
            columns.push(
                ScrollColumn::new(spec, labels.get(field)).with_settle_delay(settle_delay),
            );
        }

        if !years.contains(value.year()) {
            warn!(
                year = value.year(),
                first = years.first(),
                span = years.span(),
                "year outside picker window, year column shows the first year"
            );
        }

        Ok(Self {
            value,
            years,
            columns,
        })
    }

    pub fn value(&self) -> NaiveDateTime {
        self.value
    }

    pub fn years(&self) -> YearWindow {
        self.years
    }

    pub fn labels(&self) -> FieldLabels {
        FieldLabels::derive(self.value)
    }

    pub fn column(&self, field: Field) -> &ScrollColumn {
        &self.columns[field.position()]
    }

    /// Replace the value from outside the picker. Columns whose field
    /// changed drop their pending taps.
    pub fn sync(&mut self, value: NaiveDateTime) {
        self.value = value;
        let labels = FieldLabels::derive(value);
        for field in Field::ALL {
            self.columns[field.position()].sync(labels.get(field));
        }
    }

    /// Re-sync every column after one of them committed, in one pass.
    fn follow(&mut self, value: NaiveDateTime) {
        self.value = value;
        let labels = FieldLabels::derive(value);
        for field in Field::ALL {
            self.columns[field.position()].follow(labels.get(field));
        }
    }

    /// Route a gesture to one column. Returns the new composite value when
    /// the gesture commits.
    pub fn handle(
        &mut self,
        field: Field,
        event: ColumnEvent,
        now: Instant,
    ) -> Option<NaiveDateTime> {
        let label = self.columns[field.position()].handle(event, now)?;
        self.commit(field, &label)
    }

    /// Fire due tap commits, one composite value per commit in column order.
    pub fn poll(&mut self, now: Instant) -> Vec<NaiveDateTime> {
        let mut changes = Vec::new();
        for field in Field::ALL {
            if let Some(label) = self.columns[field.position()].poll(now)
                && let Some(value) = self.commit(field, &label)
            {
                changes.push(value);
            }
        }
        changes
    }

    pub fn has_pending_commits(&self) -> bool {
        self.columns.iter().any(ScrollColumn::has_pending_commit)
    }

    /// Apply one field's committed label to the current value.
    pub fn commit(&mut self, field: Field, label: &str) -> Option<NaiveDateTime> {
        let column = &self.columns[field.position()];
        let Some(number) = column.spec().field_value(label) else {
            warn!(field = %field, label, "committed label is not a number, ignoring");
            return None;
        };

        let Some(next) = field.apply(self.value, number) else {
            warn!(field = %field, number, "calendar arithmetic out of range, ignoring");
            return None;
        };

        if next == self.value {
            debug!(field = %field, label, "commit left value unchanged");
            return None;
        }

        info!(
            field = %field,
            label,
            from = %self.value,
            to = %next,
            "picker value committed"
        );
        self.follow(next);
        Some(next)
    }

    pub fn view(&self) -> PickerView {
        PickerView {
            columns: Field::ALL
                .iter()
                .map(|field| (*field, self.columns[field.position()].view()))
                .collect(),
        }
    }
}

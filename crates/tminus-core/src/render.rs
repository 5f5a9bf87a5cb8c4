use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::format_project_datetime;
use crate::event::Event;
use crate::picker::{ColumnView, Opacity, PickerView};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        let color = cfg.get_bool("color").unwrap_or(true);
        Self {
            color: color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, events, now))]
    pub fn print_event_table(
        &mut self,
        events: &[Event],
        now: DateTime<Utc>,
        urgent_days: i64,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Target".to_string(),
            "Countdown".to_string(),
            "Category".to_string(),
            "Name".to_string(),
            "Notes".to_string(),
        ];

        let mut rows = Vec::with_capacity(events.len());

        for event in events {
            let remaining = event.remaining(now);
            let countdown = if remaining.is_elapsed() {
                self.paint("passed", "90")
            } else if remaining.is_urgent(urgent_days) {
                self.paint(&remaining.to_string(), "31")
            } else {
                remaining.to_string()
            };

            let notes = if event.notes.is_empty() {
                String::new()
            } else {
                format!("{}/{}", event.completed_notes(), event.notes.len())
            };

            rows.push(vec![
                self.paint(&event.short_id(), "33"),
                format_project_datetime(event.target),
                countdown,
                event.category.to_string(),
                event.name.clone(),
                notes,
            ]);
        }

        let mut out = io::stdout().lock();
        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, event, now))]
    pub fn print_event_info(&mut self, event: &Event, now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id          {}", event.id)?;
        writeln!(out, "name        {}", event.name)?;
        writeln!(out, "target      {}", format_project_datetime(event.target))?;
        writeln!(out, "countdown   {}", event.remaining(now))?;
        writeln!(out, "category    {}", event.category)?;
        writeln!(out, "color       {}", event.theme_color)?;
        if !event.description.is_empty() {
            writeln!(out, "description {}", event.description)?;
        }
        writeln!(out, "created     {}", event.created.format("%Y-%m-%dT%H:%M:%SZ"))?;
        if let Some(modified) = event.modified {
            writeln!(out, "modified    {}", modified.format("%Y-%m-%dT%H:%M:%SZ"))?;
        }

        for (idx, note) in event.notes.iter().enumerate() {
            let mark = if note.completed { "x" } else { " " };
            writeln!(out, "  {:>2}. [{mark}] {}", idx + 1, note.content)?;
        }

        Ok(())
    }

    pub fn print_picker(&mut self, view: &PickerView) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_picker(&mut out, view)
    }

    /// One block per wheel, side by side: heading, then the rows inside the
    /// viewport with the centered one bracketed.
    pub fn write_picker<W: Write>(&self, mut writer: W, view: &PickerView) -> anyhow::Result<()> {
        let widths: Vec<usize> = view
            .columns
            .iter()
            .map(|(_, column)| column_width(column))
            .collect();

        let mut heading = Vec::with_capacity(view.columns.len());
        for ((_, column), width) in view.columns.iter().zip(widths.iter().copied()) {
            let label = column.label.clone().unwrap_or_default();
            heading.push(format!(" {label:^width$} "));
        }
        writeln!(writer, "{}", heading.join("  ").trim_end())?;

        let windows: Vec<_> = view
            .columns
            .iter()
            .map(|(_, column)| column.window())
            .collect();
        let height = windows.iter().map(Vec::len).max().unwrap_or(0);

        for line in 0..height {
            let mut cells = Vec::with_capacity(windows.len());
            for (window, width) in windows.iter().zip(widths.iter().copied()) {
                let cell = match window.get(line).copied().flatten() {
                    Some(row) if row.style.centered => {
                        let text = format!("{:^width$}", row.text);
                        format!(">{}<", self.paint(&text, "1"))
                    }
                    Some(row) => {
                        let text = format!("{:^width$}", row.text);
                        format!(" {} ", self.paint(&text, opacity_code(row.style.opacity)))
                    }
                    None => " ".repeat(width + 2),
                };
                cells.push(cell);
            }
            writeln!(writer, "{}", cells.join("  ").trim_end())?;
        }

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || code == "0" {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn column_width(column: &ColumnView) -> usize {
    let label = column
        .label
        .as_deref()
        .map(UnicodeWidthStr::width)
        .unwrap_or(0);
    column
        .rows
        .iter()
        .map(|row| UnicodeWidthStr::width(row.text.as_str()))
        .chain(std::iter::once(label))
        .max()
        .unwrap_or(0)
}

fn opacity_code(opacity: Opacity) -> &'static str {
    match opacity {
        Opacity::Full => "1",
        Opacity::High => "0",
        Opacity::Medium => "2",
        Opacity::Low => "90",
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(widths.iter().copied()) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for width in widths.iter().copied() {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(widths.iter().copied()) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

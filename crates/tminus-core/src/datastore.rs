use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::event::Event;

/// Events keyed by id, stored as JSON lines, plus the notification flag.
#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub events_path: PathBuf,
    pub push_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let events_path = data_dir.join("events.data");
        let push_path = data_dir.join("push.data");

        if !events_path.exists() {
            fs::write(&events_path, "")?;
        }
        if !push_path.exists() {
            fs::write(&push_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            events = %events_path.display(),
            push = %push_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            events_path,
            push_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_events(&self) -> anyhow::Result<Vec<Event>> {
        load_jsonl(&self.events_path).context("failed to load events.data")
    }

    #[tracing::instrument(skip(self, events))]
    pub fn save_events(&self, events: &[Event]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.events_path, events).context("failed to save events.data")
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn get(&self, id: Uuid) -> anyhow::Result<Option<Event>> {
        Ok(self.load_events()?.into_iter().find(|event| event.id == id))
    }

    /// Insert or replace by id. New events go to the front.
    #[tracing::instrument(skip(self, event), fields(id = %event.id))]
    pub fn set(&self, event: Event) -> anyhow::Result<Vec<Event>> {
        let mut events = self.load_events()?;
        if let Some(slot) = events.iter_mut().find(|existing| existing.id == event.id) {
            debug!("replacing stored event");
            *slot = event;
        } else {
            debug!("inserting new event");
            events.insert(0, event);
        }
        self.save_events(&events)?;
        Ok(events)
    }

    /// Returns whether an event was removed.
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let events = self.load_events()?;
        let before = events.len();
        let kept: Vec<Event> = events.into_iter().filter(|event| event.id != id).collect();
        let removed = kept.len() != before;
        if removed {
            self.save_events(&kept)?;
        }
        info!(removed, remaining = kept.len(), "delete event");
        Ok(removed)
    }

    /// Resolve a full uuid or a unique prefix of its simple form.
    #[tracing::instrument(skip(self))]
    pub fn resolve_id(&self, token: &str) -> anyhow::Result<Uuid> {
        let token = token.trim().to_ascii_lowercase();
        if token.is_empty() {
            return Err(anyhow!("event id is required"));
        }
        if let Ok(id) = Uuid::parse_str(&token) {
            return Ok(id);
        }

        let needle = token.replace('-', "");
        let mut matches = self
            .load_events()?
            .into_iter()
            .filter(|event| event.id.simple().to_string().starts_with(&needle));
        let first = matches
            .next()
            .ok_or_else(|| anyhow!("no event matches id {token}"))?;
        if matches.next().is_some() {
            return Err(anyhow!("event id {token} is ambiguous"));
        }
        Ok(first.id)
    }

    #[tracing::instrument(skip(self))]
    pub fn push_enabled(&self) -> anyhow::Result<bool> {
        let raw = fs::read_to_string(&self.push_path)
            .with_context(|| format!("failed reading {}", self.push_path.display()))?;
        Ok(raw.trim() == "true")
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle_push(&self) -> anyhow::Result<bool> {
        let enabled = !self.push_enabled()?;
        fs::write(&self.push_path, enabled.to_string())
            .with_context(|| format!("failed writing {}", self.push_path.display()))?;
        info!(enabled, "toggled push notifications");
        Ok(enabled)
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let item: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(item);
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, items))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, items: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = items.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for item in items {
        let serialized = serde_json::to_string(item)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

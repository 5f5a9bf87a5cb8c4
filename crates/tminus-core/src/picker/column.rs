use std::time::{Duration, Instant};

use anyhow::anyhow;
use tracing::{debug, trace};

use super::style::{ItemStyle, style};

pub const DEFAULT_PITCH: f32 = 48.0;
pub const DEFAULT_VISIBLE: usize = 3;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Pixel layout shared by every row of a wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pitch: f32,
    visible: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            pitch: DEFAULT_PITCH,
            visible: DEFAULT_VISIBLE,
        }
    }
}

impl Geometry {
    pub fn new(pitch: f32, visible: usize) -> anyhow::Result<Self> {
        if !pitch.is_finite() || pitch <= 0.0 {
            return Err(anyhow!("item pitch must be a positive number, got {pitch}"));
        }
        if visible == 0 || visible % 2 == 0 {
            return Err(anyhow!(
                "visible window must be an odd row count, got {visible}"
            ));
        }
        Ok(Self { pitch, visible })
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn visible(&self) -> usize {
        self.visible
    }

    /// Rows above (and below) the centered one.
    pub fn half_window(&self) -> usize {
        (self.visible - 1) / 2
    }

    /// Blank space above and below the list so the first and last rows can
    /// reach the center.
    pub fn padding(&self) -> f32 {
        self.half_window() as f32 * self.pitch
    }

    pub fn viewport_height(&self) -> f32 {
        self.visible as f32 * self.pitch
    }

    pub fn offset_for(&self, index: usize) -> f32 {
        index as f32 * self.pitch
    }

    pub fn max_offset(&self, len: usize) -> f32 {
        self.offset_for(len.saturating_sub(1))
    }

    /// Nearest row to the viewport center for a scroll offset, clamped to
    /// `[0, len - 1]`.
    pub fn index_at(&self, offset: f32, len: usize) -> usize {
        let last = len.saturating_sub(1);
        let raw = (offset / self.pitch).round();
        if raw.is_nan() || raw <= 0.0 {
            0
        } else if raw >= last as f32 {
            last
        } else {
            raw as usize
        }
    }
}

/// Immutable description of one wheel: its labels and layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    items: Vec<String>,
    geometry: Geometry,
    label: Option<String>,
}

impl ColumnSpec {
    pub fn new(items: Vec<String>, geometry: Geometry) -> anyhow::Result<Self> {
        if items.is_empty() {
            return Err(anyhow!("a picker column needs at least one item"));
        }
        Ok(Self {
            items,
            geometry,
            label: None,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn position(&self, value: &str) -> Option<usize> {
        self.items.iter().position(|item| item == value)
    }

    /// Index of `value`, or 0 when it is not one of the items.
    pub fn resolve_index(&self, value: &str) -> usize {
        self.position(value).unwrap_or(0)
    }

    /// Numeric field value carried by a label (`"07"` is 7).
    pub fn field_value(&self, label: &str) -> Option<u32> {
        label.trim().parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Dragging,
    Settling,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnEvent {
    Press,
    Scroll(f32),
    Release,
    Tap(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingCommit {
    index: usize,
    due: Instant,
}

/// One wheel of the picker.
///
/// The column never adopts a committed label on its own: gesture methods
/// return `Some(label)` when the owner should change the value, and the
/// owner pushes the authoritative value back with [`ScrollColumn::follow`]
/// (its own commits) or [`ScrollColumn::sync`] (changes from elsewhere).
#[derive(Debug, Clone)]
pub struct ScrollColumn {
    spec: ColumnSpec,
    value: String,
    offset: f32,
    highlighted: usize,
    phase: Phase,
    pending: Option<PendingCommit>,
    settle_delay: Duration,
}

impl ScrollColumn {
    pub fn new(spec: ColumnSpec, value: impl Into<String>) -> Self {
        let mut column = Self {
            spec,
            value: value.into(),
            offset: 0.0,
            highlighted: 0,
            phase: Phase::Idle,
            pending: None,
            settle_delay: DEFAULT_SETTLE_DELAY,
        };
        column.recenter();
        column
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn spec(&self) -> &ColumnSpec {
        &self.spec
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn scroll_offset(&self) -> f32 {
        self.offset
    }

    pub fn highlighted_index(&self) -> usize {
        self.highlighted
    }

    pub fn highlighted_label(&self) -> &str {
        &self.spec.items[self.highlighted]
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_settling(&self) -> bool {
        self.phase == Phase::Settling
    }

    pub fn has_pending_commit(&self) -> bool {
        self.pending.is_some()
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Adopt an authoritative value set from outside the picker.
    ///
    /// A changed value re-centers the wheel and cancels any delayed commit
    /// scheduled before it. An unchanged value only re-centers an idle
    /// wheel, so a drag or a settling tap in progress is left alone.
    pub fn sync(&mut self, value: &str) {
        if value != self.value {
            let cancelled = self.pending.take().is_some();
            debug!(
                column = self.spec.label().unwrap_or("-"),
                from = %self.value,
                to = %value,
                cancelled,
                "column value changed externally"
            );
            self.value = value.to_string();
            self.phase = Phase::Idle;
            self.recenter();
        } else if self.phase == Phase::Idle {
            self.recenter();
        }
    }

    /// Adopt a value produced by a sibling column's commit.
    ///
    /// Unlike [`ScrollColumn::sync`] this keeps a pending tap and an
    /// in-progress drag; only an idle wheel is re-centered.
    pub fn follow(&mut self, value: &str) {
        if value != self.value {
            trace!(
                column = self.spec.label().unwrap_or("-"),
                from = %self.value,
                to = %value,
                "column follows composite value"
            );
            self.value = value.to_string();
        }
        if self.phase == Phase::Idle {
            self.recenter();
        }
    }

    pub fn handle(&mut self, event: ColumnEvent, now: Instant) -> Option<String> {
        match event {
            ColumnEvent::Press => {
                self.press();
                None
            }
            ColumnEvent::Scroll(offset) => {
                self.scroll_to(offset);
                None
            }
            ColumnEvent::Release => self.release(),
            ColumnEvent::Tap(index) => {
                self.tap(index, now);
                None
            }
        }
    }

    /// Pointer or touch down. Supersedes a pending tap commit.
    pub fn press(&mut self) {
        if self.pending.take().is_some() {
            debug!(
                column = self.spec.label().unwrap_or("-"),
                "new gesture superseded pending commit"
            );
        }
        self.phase = Phase::Dragging;
    }

    /// A scroll-position sample. Moves the highlight, never commits.
    pub fn scroll_to(&mut self, offset: f32) {
        let geometry = self.spec.geometry;
        let max = geometry.max_offset(self.spec.len());
        self.offset = if offset.is_nan() {
            0.0
        } else {
            offset.clamp(0.0, max)
        };
        self.highlighted = geometry.index_at(self.offset, self.spec.len());
        trace!(
            column = self.spec.label().unwrap_or("-"),
            offset = self.offset,
            highlighted = self.highlighted,
            "scroll sample"
        );
    }

    /// Gesture end: snap to the highlighted row and commit it if it differs
    /// from the held value.
    /// A release while a tap is settling leaves the scheduled commit in
    /// charge.
    pub fn release(&mut self) -> Option<String> {
        if self.phase == Phase::Settling {
            return None;
        }
        self.phase = Phase::Idle;
        self.offset = self.spec.geometry.offset_for(self.highlighted);
        let settled = self.spec.items[self.highlighted].clone();
        self.commit_if_changed(settled)
    }

    /// Center the row at `index` and schedule its commit once the motion
    /// has settled. Replaces any earlier scheduled commit.
    pub fn tap(&mut self, index: usize, now: Instant) {
        let index = index.min(self.spec.len() - 1);
        self.offset = self.spec.geometry.offset_for(index);
        self.highlighted = index;
        self.phase = Phase::Settling;

        let replaced = self.pending.replace(PendingCommit {
            index,
            due: now + self.settle_delay,
        });
        debug!(
            column = self.spec.label().unwrap_or("-"),
            index,
            replaced = replaced.is_some(),
            "scheduled tap commit"
        );
    }

    /// Fire the scheduled tap commit once its settle delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|pending| now >= pending.due);
        if !due {
            return None;
        }

        let pending = self.pending.take()?;
        if self.phase == Phase::Settling {
            self.phase = Phase::Idle;
        }

        let label = self.spec.items[pending.index].clone();
        self.commit_if_changed(label)
    }

    pub fn view(&self) -> ColumnView {
        let geometry = self.spec.geometry;
        let rows = self
            .spec
            .items
            .iter()
            .enumerate()
            .map(|(index, text)| RowView {
                index,
                text: text.clone(),
                style: style(index, self.highlighted),
            })
            .collect();

        ColumnView {
            label: self.spec.label.clone(),
            offset: self.offset,
            padding: geometry.padding(),
            viewport_height: geometry.viewport_height(),
            half_window: geometry.half_window(),
            highlighted: self.highlighted,
            phase: self.phase,
            rows,
        }
    }

    fn recenter(&mut self) {
        let index = self.spec.resolve_index(&self.value);
        if self.spec.position(&self.value).is_none() {
            debug!(
                column = self.spec.label().unwrap_or("-"),
                value = %self.value,
                "value not among items, falling back to first row"
            );
        }
        self.highlighted = index;
        self.offset = self.spec.geometry.offset_for(index);
    }

    fn commit_if_changed(&self, label: String) -> Option<String> {
        if label == self.value {
            trace!(
                column = self.spec.label().unwrap_or("-"),
                label = %label,
                "settled on held value, nothing to commit"
            );
            return None;
        }
        debug!(
            column = self.spec.label().unwrap_or("-"),
            from = %self.value,
            to = %label,
            "column commit"
        );
        Some(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub index: usize,
    pub text: String,
    pub style: ItemStyle,
}

/// Snapshot of a column for renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnView {
    pub label: Option<String>,
    pub offset: f32,
    pub padding: f32,
    pub viewport_height: f32,
    pub half_window: usize,
    pub highlighted: usize,
    pub phase: Phase,
    pub rows: Vec<RowView>,
}

impl ColumnView {
    /// Rows inside the viewport, top to bottom. `None` marks padding above
    /// the first or below the last row.
    pub fn window(&self) -> Vec<Option<&RowView>> {
        let first = self.highlighted as isize - self.half_window as isize;
        let last = self.highlighted as isize + self.half_window as isize;
        (first..=last)
            .map(|index| {
                usize::try_from(index)
                    .ok()
                    .and_then(|index| self.rows.get(index))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{ColumnEvent, ColumnSpec, Geometry, Phase, ScrollColumn};

    fn padded(range: std::ops::RangeInclusive<u32>) -> Vec<String> {
        range.map(|n| format!("{n:02}")).collect()
    }

    fn days() -> ScrollColumn {
        let spec = ColumnSpec::new(padded(1..=31), Geometry::default())
            .expect("spec")
            .with_label("Day");
        ScrollColumn::new(spec, "15")
    }

    #[test]
    fn rejects_bad_geometry_and_empty_items() {
        assert!(Geometry::new(0.0, 3).is_err());
        assert!(Geometry::new(f32::NAN, 3).is_err());
        assert!(Geometry::new(48.0, 4).is_err());
        assert!(Geometry::new(48.0, 0).is_err());
        assert!(ColumnSpec::new(vec![], Geometry::default()).is_err());
    }

    #[test]
    fn initializes_on_the_held_value() {
        let items = padded(1..=31);
        for (index, item) in items.iter().enumerate() {
            let spec = ColumnSpec::new(items.clone(), Geometry::default()).expect("spec");
            let column = ScrollColumn::new(spec, item.clone());
            assert_eq!(column.highlighted_index(), index);
            assert_eq!(column.scroll_offset(), index as f32 * 48.0);
            assert_eq!(column.phase(), Phase::Idle);
        }
    }

    #[test]
    fn unknown_value_falls_back_to_first_row() {
        let spec = ColumnSpec::new(padded(1..=12), Geometry::default()).expect("spec");
        assert_eq!(spec.resolve_index("13"), 0);
        let column = ScrollColumn::new(spec, "13");
        assert_eq!(column.highlighted_index(), 0);
        assert_eq!(column.scroll_offset(), 0.0);
    }

    #[test]
    fn highlight_is_rounded_and_clamped() {
        let mut column = days();
        let cases = [
            (-100.0, 0),
            (0.0, 0),
            (23.0, 0),
            (24.0, 1),
            (71.0, 1),
            (72.0, 2),
            (960.0, 20),
            (1440.0, 30),
            (99_999.0, 30),
        ];
        for (offset, expected) in cases {
            column.scroll_to(offset);
            assert_eq!(column.highlighted_index(), expected, "offset {offset}");
        }
    }

    #[test]
    fn highlight_is_monotonic_in_offset() {
        let mut column = days();
        let mut previous = 0;
        let mut offset = -50.0;
        while offset < 1600.0 {
            column.scroll_to(offset);
            assert!(column.highlighted_index() >= previous);
            previous = column.highlighted_index();
            offset += 7.5;
        }
        assert_eq!(previous, 30);
    }

    #[test]
    fn drag_and_release_commits_settled_label() {
        let mut column = days();
        assert_eq!(column.highlighted_index(), 14);
        assert_eq!(column.scroll_offset(), 672.0);

        column.press();
        assert_eq!(column.phase(), Phase::Dragging);
        column.scroll_to(900.0);
        column.scroll_to(960.0);
        assert_eq!(column.release().as_deref(), Some("21"));
        assert_eq!(column.phase(), Phase::Idle);
        assert_eq!(column.scroll_offset(), 960.0);
    }

    #[test]
    fn release_snaps_between_rows() {
        let mut column = days();
        column.press();
        column.scroll_to(985.0);
        assert_eq!(column.release().as_deref(), Some("22"));
        assert_eq!(column.scroll_offset(), 1008.0);
    }

    #[test]
    fn release_on_held_value_is_a_no_op() {
        let mut column = days();
        column.press();
        column.scroll_to(680.0);
        assert_eq!(column.release(), None);

        column.press();
        assert_eq!(column.release(), None);
    }

    #[test]
    fn scroll_samples_never_commit() {
        let mut column = days();
        let now = Instant::now();
        for offset in [0.0, 200.0, 480.0] {
            assert_eq!(column.handle(ColumnEvent::Scroll(offset), now), None);
        }
        assert_eq!(column.value(), "15");
        assert_eq!(column.highlighted_label(), "11");
    }

    #[test]
    fn tap_commits_once_after_settle_delay() {
        let items = padded(1..=10);
        let spec = ColumnSpec::new(items.clone(), Geometry::default()).expect("spec");
        let mut column = ScrollColumn::new(spec, "03");
        assert_eq!(column.highlighted_index(), 2);

        let t0 = Instant::now();
        column.tap(5, t0);
        assert_eq!(column.highlighted_index(), 5);
        assert_eq!(column.scroll_offset(), 240.0);
        assert!(column.is_settling());

        assert_eq!(column.poll(t0 + Duration::from_millis(199)), None);
        assert_eq!(
            column.poll(t0 + Duration::from_millis(200)),
            Some(items[5].clone())
        );
        assert_eq!(column.poll(t0 + Duration::from_millis(400)), None);
        assert!(!column.is_settling());
    }

    #[test]
    fn later_tap_replaces_pending_commit() {
        let mut column = days();
        let t0 = Instant::now();
        column.tap(2, t0);
        column.tap(7, t0 + Duration::from_millis(100));

        assert_eq!(column.poll(t0 + Duration::from_millis(250)), None);
        assert_eq!(
            column.poll(t0 + Duration::from_millis(300)).as_deref(),
            Some("08")
        );
        assert!(!column.has_pending_commit());
    }

    #[test]
    fn press_supersedes_pending_commit() {
        let mut column = days();
        let t0 = Instant::now();
        column.tap(2, t0);
        column.press();
        assert!(!column.has_pending_commit());
        assert_eq!(column.poll(t0 + Duration::from_secs(1)), None);
    }

    #[test]
    fn external_change_cancels_tap_commit() {
        let mut column = days();
        let t0 = Instant::now();
        column.tap(2, t0);
        column.sync("20");
        assert!(!column.has_pending_commit());
        assert_eq!(column.phase(), Phase::Idle);
        assert_eq!(column.highlighted_index(), 19);

        assert_eq!(column.poll(t0 + Duration::from_secs(1)), None);
        assert_eq!(column.value(), "20");
    }

    #[test]
    fn unchanged_sync_keeps_settling_tap() {
        let mut column = days();
        let t0 = Instant::now();
        column.tap(2, t0);
        column.sync("15");
        assert_eq!(column.highlighted_index(), 2);
        assert_eq!(column.poll(t0 + Duration::from_secs(1)).as_deref(), Some("03"));
    }

    #[test]
    fn unchanged_sync_recenters_idle_column() {
        let mut column = days();
        column.scroll_to(100.0);
        column.sync("15");
        assert_eq!(column.highlighted_index(), 14);
        assert_eq!(column.scroll_offset(), 672.0);
    }

    #[test]
    fn follow_keeps_settling_tap_against_new_value() {
        let mut column = days();
        let t0 = Instant::now();
        column.tap(2, t0);
        column.follow("20");
        assert!(column.has_pending_commit());
        assert!(column.is_settling());
        assert_eq!(column.highlighted_index(), 2);
        assert_eq!(column.value(), "20");
        assert_eq!(column.poll(t0 + Duration::from_millis(200)).as_deref(), Some("03"));
    }

    #[test]
    fn follow_recenters_idle_and_leaves_drag_alone() {
        let mut column = days();
        column.follow("20");
        assert_eq!(column.highlighted_index(), 19);

        column.press();
        column.scroll_to(96.0);
        column.follow("25");
        assert_eq!(column.phase(), Phase::Dragging);
        assert_eq!(column.highlighted_index(), 2);
        assert_eq!(column.release().as_deref(), Some("03"));
    }

    #[test]
    fn release_while_settling_does_not_double_fire() {
        let mut column = days();
        let t0 = Instant::now();
        column.tap(2, t0);
        assert_eq!(column.release(), None);
        assert_eq!(column.poll(t0 + Duration::from_secs(1)).as_deref(), Some("03"));
    }

    #[test]
    fn tap_beyond_list_clamps() {
        let mut column = days();
        let t0 = Instant::now();
        column.tap(99, t0);
        assert_eq!(column.highlighted_index(), 30);
        assert_eq!(column.poll(t0 + Duration::from_secs(1)).as_deref(), Some("31"));
    }

    #[test]
    fn short_list_still_centers() {
        let spec = ColumnSpec::new(vec!["a".into(), "b".into()], Geometry::new(40.0, 5).expect("geometry"))
            .expect("spec");
        let column = ScrollColumn::new(spec, "b");
        let view = column.view();

        assert_eq!(view.padding, 80.0);
        assert_eq!(view.viewport_height, 200.0);
        let window: Vec<Option<&str>> = view
            .window()
            .into_iter()
            .map(|row| row.map(|row| row.text.as_str()))
            .collect();
        assert_eq!(window, vec![None, Some("a"), Some("b"), None, None]);
    }
}

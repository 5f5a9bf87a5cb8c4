//! Scroll-snap wheel picker.
//!
//! A [`ScrollColumn`] turns continuous scroll input into discrete commits;
//! a [`CompositePicker`] drives five of them over one date-time. Both are
//! headless: time comes in as [`std::time::Instant`] and presentation is a
//! snapshot ([`PickerView`]) that any renderer can draw.

pub mod column;
pub mod composite;
pub mod style;

pub use column::{
    ColumnEvent, ColumnSpec, ColumnView, DEFAULT_PITCH, DEFAULT_SETTLE_DELAY, DEFAULT_VISIBLE,
    Geometry, Phase, RowView, ScrollColumn,
};
pub use composite::{CompositePicker, DEFAULT_YEAR_SPAN, Field, FieldLabels, PickerView, YearWindow};
pub use style::{ItemStyle, Opacity, Scale, style};

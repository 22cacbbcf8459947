//! Status screen: layout, field composition and the incremental renderer

pub mod colors;
mod fields;
mod graphics;
pub mod layout;
mod reconciler;

pub use fields::{FieldText, FieldValue, compose, field_for};
pub use graphics::GraphicsSink;
pub use layout::{SLOT_COUNT, Slot, SlotSpec};
pub use reconciler::{DisplayReconciler, DisplaySink, DrawOp, DrawPlan};

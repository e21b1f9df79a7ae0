//! Application layer: the render pipeline and the widget that drives it.

pub mod error;
pub mod render;
pub mod widget;

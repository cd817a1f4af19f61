//! Per-item render callbacks and the terminal card painter.

mod core;

pub use core::{AnsiRenderer, CardText, ItemRenderer, RenderItem, RendererSettings};

//! Terminal UI components.
//!
//! - [`viewport`]: scroll position and visible range
//! - [`style`]: themes and the attribute-to-terminal-style mapping
//! - [`lines_for_tree`]: visual tree layout into wrapped lines

pub mod style;
pub mod viewport;

mod layout;
mod overlays;
mod render;
mod status;

pub use layout::{lines_for_tree, DocLines};
pub use render::{document_content_width, render};

pub const DOCUMENT_LEFT_PADDING: u16 = 2;

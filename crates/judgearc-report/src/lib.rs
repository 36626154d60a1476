//! judgearc-report — Progress report rendering.

pub mod html;
pub mod text;

pub use html::{generate_html, write_html_report};
pub use text::render_text;

//! Terminal presentation layer (ratatui + crossterm)

pub mod layout;
pub mod renderer;
pub mod terminal;

pub use layout::ViewState;
pub use terminal::run_ui;

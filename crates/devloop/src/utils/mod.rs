pub mod browser;
pub mod terminal_input;

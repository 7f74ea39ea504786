pub mod app_state;
pub mod menu;
pub mod settings;
pub mod terminal;

pub mod app;
pub mod install_button;
pub mod player_view;
pub mod transport_controls;

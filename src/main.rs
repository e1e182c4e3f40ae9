#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod audio;
mod data_colouring;
mod foreground;
mod gpu_data;
mod gpu_data_nvidia;
mod monitors;
mod placement;
mod render_loop;
mod settings;
mod settings_panel;
mod settings_store;
mod state;
mod styles;
mod subscriptions;
mod system_stats;
mod telemetry;
mod text_block;
mod tray;

use crate::state::State;

pub fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("deskstat {} starting", env!("CARGO_PKG_VERSION"));

    // Every window is opened from State::boot, so the daemon starts with none
    iced::daemon(State::title, State::update, State::view)
        .subscription(State::subscription)
        .theme(State::theme)
        .run_with(State::boot)
}

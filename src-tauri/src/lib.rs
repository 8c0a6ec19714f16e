//! Diagonal Racer - Tauri Backend
//!
//! Runs the diagonal track and racer simulation and exposes it to the
//! frontend through commands. The simulation core builds without the
//! desktop shell; enable the `desktop` feature for the Tauri app.

pub mod game_server;

#[cfg(feature = "desktop")]
mod commands;

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use game_server::GameServer;
    use std::sync::Mutex;

    tauri::Builder::default()
        .manage(Mutex::new(GameServer::new()))
        .setup(|app| {
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }
            log::info!("Diagonal Racer game server initialized");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::init_race,
            commands::load_race_config,
            commands::start_race,
            commands::tick,
            commands::advance_frame,
            commands::get_snapshot,
            commands::get_results,
            commands::get_stats,
            commands::get_game_state,
            commands::tune_track,
            commands::pause_race,
            commands::resume_race,
            commands::reset_race,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

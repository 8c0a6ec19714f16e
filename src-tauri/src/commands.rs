//! Tauri commands wrapping the shared `GameServer`

use std::sync::Mutex;

use tauri::State;

use crate::game_server::config::{RaceConfig, RacerConfig, TrackTuning};
use crate::game_server::race::{RaceResult, RaceSnapshot};
use crate::game_server::simulation::{GameServer, GameState, ServerStats};

/// Initialize a new race from the default config with optional overrides
#[tauri::command]
pub fn init_race(
    server: State<'_, Mutex<GameServer>>,
    racer_count: Option<u32>,
    scroll_speed: Option<f32>,
    seed: Option<u64>,
) -> Result<(), String> {
    let mut server = server.lock().map_err(|e| e.to_string())?;

    let mut config = RaceConfig {
        seed,
        ..Default::default()
    };
    if let Some(speed) = scroll_speed {
        config.scroll_speed = speed;
    }
    if let Some(count) = racer_count {
        config.racers = RacerConfig::roster()
            .into_iter()
            .take(count as usize)
            .collect();
    }

    let racer_count = config.racers.len();
    server.init_race(config).map_err(|e| e.to_string())?;
    log::info!("Race initialized with {} racers", racer_count);
    Ok(())
}

/// Initialize a new race from a JSON config
#[tauri::command]
pub fn load_race_config(server: State<'_, Mutex<GameServer>>, json: String) -> Result<(), String> {
    let config = RaceConfig::from_json(&json).map_err(|e| e.to_string())?;
    let mut server = server.lock().map_err(|e| e.to_string())?;
    server.init_race(config).map_err(|e| e.to_string())?;
    log::info!("Race initialized from JSON config");
    Ok(())
}

/// Start the race countdown
#[tauri::command]
pub fn start_race(server: State<'_, Mutex<GameServer>>) -> Result<(), String> {
    let mut server = server.lock().map_err(|e| e.to_string())?;
    server.start_race();
    log::info!("Race started");
    Ok(())
}

/// Advance by wall-clock time and return the current state
#[tauri::command]
pub fn tick(server: State<'_, Mutex<GameServer>>) -> Result<Option<RaceSnapshot>, String> {
    let mut server = server.lock().map_err(|e| e.to_string())?;
    Ok(server.tick())
}

/// Advance by a frame delta measured by the frontend
#[tauri::command]
pub fn advance_frame(
    server: State<'_, Mutex<GameServer>>,
    delta_ms: f32,
) -> Result<Option<RaceSnapshot>, String> {
    let mut server = server.lock().map_err(|e| e.to_string())?;
    Ok(server.advance_frame(delta_ms))
}

/// Get current race snapshot without advancing simulation
#[tauri::command]
pub fn get_snapshot(server: State<'_, Mutex<GameServer>>) -> Result<Option<RaceSnapshot>, String> {
    let server = server.lock().map_err(|e| e.to_string())?;
    Ok(server.get_snapshot())
}

/// Get race results
#[tauri::command]
pub fn get_results(
    server: State<'_, Mutex<GameServer>>,
) -> Result<Option<Vec<RaceResult>>, String> {
    let server = server.lock().map_err(|e| e.to_string())?;
    Ok(server.get_results())
}

/// Get server statistics
#[tauri::command]
pub fn get_stats(server: State<'_, Mutex<GameServer>>) -> Result<ServerStats, String> {
    let server = server.lock().map_err(|e| e.to_string())?;
    Ok(server.get_stats())
}

/// Get current game state
#[tauri::command]
pub fn get_game_state(server: State<'_, Mutex<GameServer>>) -> Result<GameState, String> {
    let server = server.lock().map_err(|e| e.to_string())?;
    Ok(server.get_state())
}

/// Debug controls: chain height, diagonal ratio, zoom
#[tauri::command]
pub fn tune_track(
    server: State<'_, Mutex<GameServer>>,
    tuning: TrackTuning,
) -> Result<(), String> {
    let mut server = server.lock().map_err(|e| e.to_string())?;
    server.tune_track(tuning).map_err(|e| e.to_string())?;
    log::info!("Track retuned: {:?}", tuning);
    Ok(())
}

/// Pause the simulation
#[tauri::command]
pub fn pause_race(server: State<'_, Mutex<GameServer>>) -> Result<(), String> {
    let mut server = server.lock().map_err(|e| e.to_string())?;
    server.pause();
    log::info!("Race paused");
    Ok(())
}

/// Resume the simulation
#[tauri::command]
pub fn resume_race(server: State<'_, Mutex<GameServer>>) -> Result<(), String> {
    let mut server = server.lock().map_err(|e| e.to_string())?;
    server.resume();
    log::info!("Race resumed");
    Ok(())
}

/// Reset to idle state
#[tauri::command]
pub fn reset_race(server: State<'_, Mutex<GameServer>>) -> Result<(), String> {
    let mut server = server.lock().map_err(|e| e.to_string())?;
    server.reset();
    log::info!("Race reset");
    Ok(())
}

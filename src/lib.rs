//! Bus Race - Tauri Backend
//!
//! Race core for the bus race picker, plus the commands the webview uses to
//! drive it when built with the `desktop` feature.

pub mod race_server;

#[cfg(feature = "desktop")]
mod desktop {
    use crate::race_server::{
        PendingFrame, RaceConfig, RaceServer, RaceSnapshot, RaceState, ReportedClip,
        SeededRandom, TrackLayout,
    };
    use std::sync::Mutex;
    use tauri::State;

    pub type DesktopServer = RaceServer<SeededRandom, ReportedClip, PendingFrame>;

    fn new_server() -> DesktopServer {
        RaceServer::new(
            RaceConfig::default(),
            SeededRandom::from_entropy(),
            ReportedClip::new(),
            PendingFrame::new(),
        )
    }

    /// Replace the option inputs with `count` defaults (clamped)
    #[tauri::command]
    fn create_options(
        server: State<'_, Mutex<DesktopServer>>,
        count: Option<i64>,
    ) -> Result<Vec<String>, String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        let min = server.config().min_options as i64;
        Ok(server.create_options(count.unwrap_or(min)).to_vec())
    }

    /// Store the option names as currently typed
    #[tauri::command]
    fn set_options(
        server: State<'_, Mutex<DesktopServer>>,
        names: Vec<String>,
    ) -> Result<(), String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.set_options(names);
        Ok(())
    }

    /// Start the race. The webview reports the audio clip length it resolved
    /// (`None` if the clip failed to load) and why `play()` was refused, if
    /// it was.
    #[tauri::command]
    fn start_race(
        server: State<'_, Mutex<DesktopServer>>,
        now_ms: f64,
        audio_duration_secs: Option<f64>,
        audio_blocked: Option<String>,
    ) -> Result<RaceSnapshot, String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        if server.state() == RaceState::Running {
            return Ok(server.get_snapshot());
        }
        server.audio_mut().report_duration(audio_duration_secs);
        server.audio_mut().report_playback(audio_blocked);
        server.start(now_ms);
        Ok(server.get_snapshot())
    }

    /// Deliver an animation frame and return the updated state
    #[tauri::command]
    fn tick(server: State<'_, Mutex<DesktopServer>>, now_ms: f64) -> Result<RaceSnapshot, String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.frame(now_ms);
        Ok(server.get_snapshot())
    }

    /// Reset to idle state
    #[tauri::command]
    fn reset_race(server: State<'_, Mutex<DesktopServer>>) -> Result<RaceSnapshot, String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.reset();
        Ok(server.get_snapshot())
    }

    /// New track measurements from the webview
    #[tauri::command]
    fn resize_track(
        server: State<'_, Mutex<DesktopServer>>,
        layout: TrackLayout,
    ) -> Result<RaceSnapshot, String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.resize(layout);
        Ok(server.get_snapshot())
    }

    /// Get current race snapshot without advancing
    #[tauri::command]
    fn get_snapshot(server: State<'_, Mutex<DesktopServer>>) -> Result<RaceSnapshot, String> {
        let server = server.lock().map_err(|e| e.to_string())?;
        Ok(server.get_snapshot())
    }

    /// Replace the race configuration from JSON
    #[tauri::command]
    fn load_config(server: State<'_, Mutex<DesktopServer>>, json: String) -> Result<(), String> {
        let config = RaceConfig::from_json(&json).map_err(|e| e.to_string())?;
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.set_config(config);
        Ok(())
    }

    pub fn run() {
        tauri::Builder::default()
            .manage(Mutex::new(new_server()))
            .setup(|app| {
                if cfg!(debug_assertions) {
                    app.handle().plugin(
                        tauri_plugin_log::Builder::default()
                            .level(log::LevelFilter::Info)
                            .build(),
                    )?;
                }
                log::info!("Bus race server initialized");
                Ok(())
            })
            .invoke_handler(tauri::generate_handler![
                create_options,
                set_options,
                start_race,
                tick,
                reset_race,
                resize_track,
                get_snapshot,
                load_config,
            ])
            .run(tauri::generate_context!())
            .expect("error while running tauri application");
    }
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    desktop::run()
}

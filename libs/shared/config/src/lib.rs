use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub port: u16,
    /// When true, bookings skip the doctor-approval step and are created
    /// directly in the confirmed state.
    pub auto_confirm_bookings: bool,
    /// Optional path to a JSON directory snapshot (doctors, services,
    /// schedules, patients) loaded at startup.
    pub directory_file: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            bind_address: env::var("SCHED_BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SCHED_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(|| {
                    warn!("SCHED_PORT not set or invalid, using 3000");
                    3000
                }),
            auto_confirm_bookings: env::var("SCHED_AUTO_CONFIRM")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            directory_file: env::var("SCHED_DIRECTORY_FILE").ok(),
        };

        if config.directory_file.is_none() {
            warn!("SCHED_DIRECTORY_FILE not set - starting with an empty directory");
        }

        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            auto_confirm_bookings: false,
            directory_file: None,
        }
    }
}

use std::env;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub db_max_connections: u32,
    pub listen_addr: String,
    pub jwt_secret: String,
    pub interconnect_api_url: String,
    pub interconnect_api_token: String,
    pub interconnect_timeout_secs: u64,
    /// Lets ADMIN/OWNER accounts clear a booking held by someone else.
    pub admin_force_unbook: bool,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            db_path: get_env("DB_PATH", "/data/labforge.db"),
            db_max_connections: get_env("DB_MAX_CONNECTIONS", "5")
                .parse()
                .unwrap_or(5),
            listen_addr: get_env("LISTEN_ADDR", "0.0.0.0:8080"),
            jwt_secret: get_env("JWT_SECRET", ""),
            interconnect_api_url: get_env("INTERCONNECT_API_URL", "http://localhost:4000"),
            interconnect_api_token: get_env("INTERCONNECT_API_TOKEN", ""),
            interconnect_timeout_secs: get_env("INTERCONNECT_TIMEOUT_SECS", "30")
                .parse()
                .unwrap_or(30),
            admin_force_unbook: parse_flag(&get_env("ADMIN_FORCE_UNBOOK", "false")),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: ":memory:".to_string(),
            db_max_connections: 1,
            listen_addr: "127.0.0.1:8080".to_string(),
            jwt_secret: String::new(),
            interconnect_api_url: "http://localhost:4000".to_string(),
            interconnect_api_token: String::new(),
            interconnect_timeout_secs: 30,
            admin_force_unbook: false,
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

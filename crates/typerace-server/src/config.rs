use serde::Deserialize;

/// Top-level server configuration, loaded from `typerace.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Single origin allowed by CORS. `None` allows any origin.
    pub allowed_origin: Option<String>,
    pub limits: LimitsConfig,
    pub race: RaceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3001".to_string(),
            allowed_origin: None,
            limits: LimitsConfig::default(),
            race: RaceConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub player_message_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            player_message_buffer: 256,
        }
    }
}

/// Countdown and test timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub countdown_from: u32,
    pub tick_millis: u64,
    /// Seconds between the start signal and final results. 0 disables
    /// final results.
    pub test_duration_secs: u64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            countdown_from: 3,
            tick_millis: 1000,
            test_duration_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Validate configuration, exiting on values the server cannot run with.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }

        if let Some(ref origin) = self.allowed_origin
            && origin.parse::<axum::http::HeaderValue>().is_err()
        {
            tracing::error!(origin = %origin, "allowed_origin is not a valid header value");
            std::process::exit(1);
        }

        if self.limits.max_ws_connections == 0 {
            tracing::error!("limits.max_ws_connections must be > 0");
            std::process::exit(1);
        }
        if self.limits.player_message_buffer == 0 {
            tracing::error!("limits.player_message_buffer must be > 0");
            std::process::exit(1);
        }

        if self.race.tick_millis == 0 {
            tracing::error!("race.tick_millis must be > 0");
            std::process::exit(1);
        }
        if self.race.test_duration_secs == 0 {
            tracing::info!("race.test_duration_secs is 0, final results are disabled");
        }
    }

    /// Load config from `typerace.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("typerace.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from typerace.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse typerace.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No typerace.toml found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("TYPERACE_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(val) = std::env::var("PORT")
            && let Ok(port) = val.parse::<u16>()
        {
            config.listen_addr = with_port(&config.listen_addr, port);
        }
        if let Ok(origin) = std::env::var("TYPERACE_ALLOWED_ORIGIN")
            && !origin.is_empty()
        {
            config.allowed_origin = Some(origin);
        }

        if let Ok(val) = std::env::var("TYPERACE_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_ws_connections = n;
        }
        if let Ok(val) = std::env::var("TYPERACE_TEST_DURATION_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.race.test_duration_secs = n;
        }

        config
    }
}

/// Replace the port of a `host:port` address, keeping the host.
fn with_port(addr: &str, port: u16) -> String {
    match addr.rsplit_once(':') {
        Some((host, _)) => format!("{host}:{port}"),
        None => format!("{addr}:{port}"),
    }
}

use serde::Deserialize;

/// Top-level configuration settings for the gateway.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub notifier: NotifierSettings,
    pub log: LogSettings,
}

/// Addresses the WebSocket edge and the metrics endpoint bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub metrics_port: u16,
}

/// Resource limits applied by the broker core.
///
/// Exceeding any of them yields `CapacityExceeded`.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub max_queue_depth: usize,
    pub max_message_bytes: usize,
    pub max_topics_per_tenant: usize,
}

/// Push delivery settings.
#[derive(Debug, Deserialize, Clone)]
pub struct NotifierSettings {
    pub timeout_ms: u64,
    /// Upper bound on notifications being delivered at once.
    pub max_in_flight: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Default, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub notifier: Option<PartialNotifierSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub max_queue_depth: Option<usize>,
    pub max_message_bytes: Option<usize>,
    pub max_topics_per_tenant: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialNotifierSettings {
    pub timeout_ms: Option<u64>,
    pub max_in_flight: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            broker: BrokerSettings::default(),
            notifier: NotifierSettings::default(),
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            metrics_port: 9090,
        }
    }
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            max_queue_depth: 10_000,
            max_message_bytes: 256 * 1024,
            max_topics_per_tenant: 1_000,
        }
    }
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_in_flight: 64,
        }
    }
}

impl PartialSettings {
    /// Overlay the values that are present on top of `defaults`.
    pub fn merge_onto(self, defaults: Settings) -> Settings {
        let server = match self.server {
            Some(s) => ServerSettings {
                host: s.host.unwrap_or(defaults.server.host),
                port: s.port.unwrap_or(defaults.server.port),
                metrics_port: s.metrics_port.unwrap_or(defaults.server.metrics_port),
            },
            None => defaults.server,
        };

        let broker = match self.broker {
            Some(b) => BrokerSettings {
                max_queue_depth: b.max_queue_depth.unwrap_or(defaults.broker.max_queue_depth),
                max_message_bytes: b
                    .max_message_bytes
                    .unwrap_or(defaults.broker.max_message_bytes),
                max_topics_per_tenant: b
                    .max_topics_per_tenant
                    .unwrap_or(defaults.broker.max_topics_per_tenant),
            },
            None => defaults.broker,
        };

        let notifier = match self.notifier {
            Some(n) => NotifierSettings {
                timeout_ms: n.timeout_ms.unwrap_or(defaults.notifier.timeout_ms),
                max_in_flight: n.max_in_flight.unwrap_or(defaults.notifier.max_in_flight),
            },
            None => defaults.notifier,
        };

        let log = LogSettings {
            level: self
                .log
                .and_then(|l| l.level)
                .unwrap_or(defaults.log.level),
        };

        Settings {
            server,
            broker,
            notifier,
            log,
        }
    }
}

//! Engine configuration.

/// Default capacity of the subscription-error broadcast channel.
pub const DEFAULT_ERROR_CAPACITY: usize = 16;

/// Configuration for [`SyncEngine`](crate::SyncEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Human-readable client name, carried in log output.
    pub client_name: String,
    /// Capacity of the error observer channel; lagging observers drop
    /// the oldest errors first.
    pub error_capacity: usize,
}

impl EngineConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            client_name: "taskmirror client".to_string(),
            error_capacity: DEFAULT_ERROR_CAPACITY,
        }
    }

    /// Set the client name.
    pub fn with_client_name(mut self, name: &str) -> Self {
        self.client_name = name.to_string();
        self
    }

    /// Set the error channel capacity.
    pub fn with_error_capacity(mut self, capacity: usize) -> Self {
        self.error_capacity = capacity;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

//! Database configuration.

use objgraph_storage::DEFAULT_EXTENSION;

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the database directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to fsync every record write (safer but slower).
    pub sync_on_write: bool,

    /// Whether to take the exclusive `LOCK` file on open.
    pub lock_directory: bool,

    /// File extension of record files, without the dot.
    pub record_extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_write: true,
            lock_directory: true,
            record_extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the database if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to fsync every record write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets whether to lock the database directory.
    #[must_use]
    pub const fn lock_directory(mut self, value: bool) -> Self {
        self.lock_directory = value;
        self
    }

    /// Sets the record file extension.
    #[must_use]
    pub fn record_extension(mut self, extension: impl Into<String>) -> Self {
        self.record_extension = extension.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert!(config.sync_on_write);
        assert!(config.lock_directory);
        assert_eq!(config.record_extension, "rec");
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .create_if_missing(false)
            .sync_on_write(false)
            .record_extension("obj");

        assert!(!config.create_if_missing);
        assert!(!config.sync_on_write);
        assert_eq!(config.record_extension, "obj");
    }
}

//! Configuration options for CompactMap.

/// Default soft capacity of a chunk, in entries.
pub const DEFAULT_CHUNK_CAPACITY: usize = 1000;

/// Default size of the read/write buffer used by save and load.
pub const DEFAULT_IO_BUFFER_SIZE: usize = 50 * 1024 * 1024; // 50MB

/// Configuration options for maps and record stores.
#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum number of entries a chunk accepts before a new chunk is started.
    /// Default: 1000
    pub chunk_capacity: usize,

    /// Buffer size for file I/O during save and load (in bytes).
    /// Default: 50MB
    pub io_buffer_size: usize,

    /// Suffix appended to a record store's file name to form the id counter file.
    /// Default: "i"
    pub counter_suffix: String,

    /// Fail when opening a record store whose files cannot be loaded.
    /// Default: false
    pub fail_if_missing: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            io_buffer_size: DEFAULT_IO_BUFFER_SIZE,
            counter_suffix: "i".to_string(),
            fail_if_missing: false,
        }
    }
}

impl Options {
    /// Creates a new Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the chunk capacity.
    pub fn chunk_capacity(mut self, capacity: usize) -> Self {
        self.chunk_capacity = capacity;
        self
    }

    /// Sets the I/O buffer size.
    pub fn io_buffer_size(mut self, size: usize) -> Self {
        self.io_buffer_size = size;
        self
    }

    /// Sets the counter file suffix.
    pub fn counter_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.counter_suffix = suffix.into();
        self
    }

    /// Sets whether a record store must load its files on open.
    pub fn fail_if_missing(mut self, value: bool) -> Self {
        self.fail_if_missing = value;
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.chunk_capacity == 0 {
            return Err(crate::Error::invalid_argument("chunk_capacity must be > 0"));
        }
        if self.io_buffer_size == 0 {
            return Err(crate::Error::invalid_argument("io_buffer_size must be > 0"));
        }
        if self.counter_suffix.is_empty() {
            return Err(crate::Error::invalid_argument("counter_suffix must not be empty"));
        }
        Ok(())
    }
}

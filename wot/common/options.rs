use wot_gc::HeapConfig;

/// Number of slots in the node pool
pub const DEFAULT_POOL_CAPACITY: usize = 70;

/// Overwritten composites that can await a collection at once
pub const DEFAULT_STALE_CAPACITY: usize = 16;

pub const DEFAULT_PIN_CAPACITY: usize = 32;

pub const DEFAULT_MAX_THINGS: usize = 8;

pub const DEFAULT_MAX_PROXIES: usize = 8;

/// Size of the symbol table
pub const DEFAULT_SYMBOL_CAPACITY: usize = 31;

/// Number of strings that can be live at once
pub const DEFAULT_TEXT_CAPACITY: usize = 32;

/// Options passed throughout the program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Number of slots in the node pool. Every value and every tree node uses one.
    pub pool_capacity: usize,

    /// Capacity of the stale set
    pub stale_capacity: usize,

    /// Depth of the pin stack
    pub pin_capacity: usize,

    /// Maximum number of registered things
    pub max_things: usize,

    /// Maximum number of registered proxies
    pub max_proxies: usize,

    /// Maximum number of distinct property, action and event names
    pub symbol_capacity: usize,

    /// Maximum number of live string values
    pub text_capacity: usize,
}

impl Options {
    /// The heap sizes these options describe
    pub fn heap_config(&self) -> HeapConfig {
        HeapConfig {
            pool_capacity: self.pool_capacity,
            stale_capacity: self.stale_capacity,
            pin_capacity: self.pin_capacity,
        }
    }
}

impl Default for Options {
    /// Create a new options struct with default values.
    fn default() -> Self {
        OptionsBuilder::new().build()
    }
}

pub struct OptionsBuilder(Options);

impl OptionsBuilder {
    /// Create new options with default values.
    pub fn new() -> Self {
        Self(Options {
            pool_capacity: DEFAULT_POOL_CAPACITY,
            stale_capacity: DEFAULT_STALE_CAPACITY,
            pin_capacity: DEFAULT_PIN_CAPACITY,
            max_things: DEFAULT_MAX_THINGS,
            max_proxies: DEFAULT_MAX_PROXIES,
            symbol_capacity: DEFAULT_SYMBOL_CAPACITY,
            text_capacity: DEFAULT_TEXT_CAPACITY,
        })
    }

    /// Return the options that have been built, consuming the builder.
    pub fn build(self) -> Options {
        self.0
    }

    pub fn pool_capacity(mut self, pool_capacity: usize) -> Self {
        self.0.pool_capacity = pool_capacity;
        self
    }

    pub fn stale_capacity(mut self, stale_capacity: usize) -> Self {
        self.0.stale_capacity = stale_capacity;
        self
    }

    pub fn pin_capacity(mut self, pin_capacity: usize) -> Self {
        self.0.pin_capacity = pin_capacity;
        self
    }

    pub fn max_things(mut self, max_things: usize) -> Self {
        self.0.max_things = max_things;
        self
    }

    pub fn max_proxies(mut self, max_proxies: usize) -> Self {
        self.0.max_proxies = max_proxies;
        self
    }

    pub fn symbol_capacity(mut self, symbol_capacity: usize) -> Self {
        self.0.symbol_capacity = symbol_capacity;
        self
    }

    pub fn text_capacity(mut self, text_capacity: usize) -> Self {
        self.0.text_capacity = text_capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let options = OptionsBuilder::new()
            .pool_capacity(256)
            .stale_capacity(4)
            .build();

        assert_eq!(options.pool_capacity, 256);
        assert_eq!(options.stale_capacity, 4);
        assert_eq!(options.symbol_capacity, DEFAULT_SYMBOL_CAPACITY);

        let config = options.heap_config();
        assert_eq!(config.pool_capacity, 256);
        assert_eq!(config.stale_capacity, 4);
        assert_eq!(config.pin_capacity, DEFAULT_PIN_CAPACITY);
    }
}

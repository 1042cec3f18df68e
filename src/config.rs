//! Engine configuration.
//!
//! ```
//! use xlang_wire::config::{Config, AFTER_CODEC_COMPILED};
//!
//! let config = Config::default()
//!     .with_ref_tracking(true)
//!     .with_hook(AFTER_CODEC_COMPILED, |info| {
//!         println!("compiled {} ({} bytes reserved)", info.tag, info.fixed_size);
//!     });
//! assert!(config.ref_tracking);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Hook point invoked once per compiled struct codec.
pub const AFTER_CODEC_COMPILED: &str = "afterCodecCompiled";

/// What a hook is told about a freshly compiled codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecInfo {
    pub tag: String,
    pub type_id: u32,
    /// Field names in wire order.
    pub fields: Vec<String>,
    pub fixed_size: usize,
}

/// Hook callback.
pub type Hook = Rc<dyn Fn(&CodecInfo)>;

/// Extension-point name → callback.
#[derive(Clone, Default)]
pub struct Hooks {
    hooks: HashMap<String, Hook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a callback under `name`, replacing any previous one.
    pub fn insert<F>(&mut self, name: &str, hook: F)
    where
        F: Fn(&CodecInfo) + 'static,
    {
        self.hooks.insert(name.to_string(), Rc::new(hook));
    }

    pub fn get(&self, name: &str) -> Option<&Hook> {
        self.hooks.get(name)
    }

    /// Invoke the hook registered under `name`, if any.
    pub(crate) fn fire(&self, name: &str, info: &CodecInfo) {
        if let Some(hook) = self.hooks.get(name) {
            hook(info);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.hooks.keys()).finish()
    }
}

/// Per-engine settings. Fixed once the engine is built.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deduplicate shared instances and support cycles.
    pub ref_tracking: bool,
    /// Decode ASCII strings directly from the input slice.
    pub use_slice_string: bool,
    /// Extension callbacks.
    pub hooks: Hooks,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ref_tracking: false,
            use_slice_string: true,
            hooks: Hooks::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ref_tracking(mut self, enabled: bool) -> Self {
        self.ref_tracking = enabled;
        self
    }

    pub fn with_slice_string(mut self, enabled: bool) -> Self {
        self.use_slice_string = enabled;
        self
    }

    pub fn with_hook<F>(mut self, name: &str, hook: F) -> Self
    where
        F: Fn(&CodecInfo) + 'static,
    {
        self.hooks.insert(name, hook);
        self
    }
}

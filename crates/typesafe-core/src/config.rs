//! Scoped runtime switches.
//!
//! Scopes live on a per-thread stack. The innermost entered `Config` is the
//! active one; with no scope entered every flag is off and full validation
//! applies.
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, fmt, marker::PhantomData};

thread_local! {
    static CONFIG_STACK: RefCell<Vec<Config>> = const { RefCell::new(Vec::new()) };
}

///
/// Config
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Config {
    /// Build instances from the cached construction schema.
    pub fast_create: bool,
    /// Store assigned values without running the validator.
    pub skip_validation: bool,
    /// Refuse inputs that would need conversion (e.g. `str` into `Safe_Id`).
    pub skip_conversion: bool,
    /// Reuse the cached descriptor instead of walking the ancestry.
    pub skip_mro_walk: bool,
    /// Leave nested objects unbuilt until first read.
    pub on_demand_nested: bool,
    /// Typed collections store items without per-item checks.
    pub fast_collections: bool,
}

impl Config {
    /// Maximum throughput; nothing is checked.
    #[must_use]
    pub const fn fast_mode() -> Self {
        Self {
            fast_create: true,
            skip_validation: true,
            skip_conversion: true,
            skip_mro_walk: true,
            on_demand_nested: false,
            fast_collections: true,
        }
    }

    #[must_use]
    pub const fn on_demand_mode() -> Self {
        Self {
            fast_create: false,
            skip_validation: false,
            skip_conversion: false,
            skip_mro_walk: false,
            on_demand_nested: true,
            fast_collections: false,
        }
    }

    /// Loading from a trusted source.
    #[must_use]
    pub const fn bulk_load_mode() -> Self {
        Self {
            fast_create: true,
            skip_validation: true,
            skip_conversion: true,
            skip_mro_walk: false,
            on_demand_nested: false,
            fast_collections: false,
        }
    }

    /// Push this config; it stays active until the guard drops.
    #[must_use = "the scope ends as soon as the guard is dropped"]
    pub fn enter(self) -> ConfigGuard {
        CONFIG_STACK.with(|stack| stack.borrow_mut().push(self));

        ConfigGuard {
            _not_send: PhantomData,
        }
    }

    fn enabled(&self) -> Vec<&'static str> {
        [
            (self.fast_create, "fast_create"),
            (self.skip_validation, "skip_validation"),
            (self.skip_conversion, "skip_conversion"),
            (self.skip_mro_walk, "skip_mro_walk"),
            (self.on_demand_nested, "on_demand_nested"),
            (self.fast_collections, "fast_collections"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let enabled = self.enabled();

        if enabled.is_empty() {
            f.write_str("Config(default)")
        } else {
            write!(f, "Config({})", enabled.join(", "))
        }
    }
}

///
/// ConfigGuard
///
/// Pops its config on drop, including during unwinding. Tied to the
/// thread that entered it.
///

pub struct ConfigGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for ConfigGuard {
    fn drop(&mut self) {
        CONFIG_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Innermost active config, or the all-off default.
#[must_use]
pub fn current() -> Config {
    CONFIG_STACK.with(|stack| stack.borrow().last().copied().unwrap_or_default())
}

/// Run `f` with `config` active.
pub fn with_config<T>(config: Config, f: impl FnOnce() -> T) -> T {
    let _guard = config.enter();

    f()
}

///
/// TESTS
///

use serde::{Deserialize, Serialize};

use crate::stats::{Counter, StatsKey, StatsRegistry};

/// Stats level at which per-node evaluation counters are registered.
pub const STATS_LEVEL_DETAIL: u8 = 3;

/// Static runtime settings, loadable from the pipeline's configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Capture source text on node locations and emit falsy diagnostics.
    #[serde(default)]
    pub debug: bool,

    /// Emit a trace record for every evaluated statement of a compound.
    #[serde(default)]
    pub trace: bool,

    /// Counter registration threshold; per-node counters need
    /// [`STATS_LEVEL_DETAIL`].
    #[serde(default = "default_stats_level")]
    pub stats_level: u8,
}

fn default_stats_level() -> u8 {
    STATS_LEVEL_DETAIL
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            trace: false,
            stats_level: default_stats_level(),
        }
    }
}

/// Configuration handed to `init`/`deinit`: the static settings plus the
/// injected telemetry registry. One instance is owned by the pipeline and
/// shared with every expression tree it configures.
#[derive(Clone, Default)]
pub struct GlobalConfig {
    pub settings: Settings,
    pub stats: StatsRegistry,
}

impl GlobalConfig {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            stats: StatsRegistry::new(),
        }
    }

    /// Registers an eval counter, or returns a dormant handle when the
    /// configured stats level is below the per-node detail threshold.
    pub fn register_counter(&self, key: StatsKey) -> Counter {
        if self.settings.stats_level < STATS_LEVEL_DETAIL {
            return Counter::default();
        }
        self.stats.register(key)
    }

    pub fn unregister_counter(&self, key: &StatsKey, counter: &mut Counter) {
        self.stats.unregister(key, counter);
    }
}

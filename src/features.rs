//! Feature switches stored under `_features` in memory. Operators flip them from the console.

use crate::memory_helper::*;
use serde_json::{json, Value};

pub fn prepare(features: &mut Value) {
    if !features.is_object() {
        *features = json!({});
    }

    defaults_deep(
        features,
        &json!({
            "reset": {
                "environment": false,
                "memory": false,
            },
            "paving": {
                "on": true,
            },
            "spawn": {
                "mute": false,
            },
            "intel": {
                "store": true,
            },
            "gc": {
                "on": true,
            },
        }),
    );
}

pub mod reset {
    use super::*;

    pub fn reset_environment(features: &Value) -> bool {
        path_bool(features, "reset.environment")
    }

    pub fn reset_memory(features: &Value) -> bool {
        path_bool(features, "reset.memory")
    }

    pub fn clear(features: &mut Value) {
        path_set(features, "reset.environment", false);
        path_set(features, "reset.memory", false);
    }
}

pub mod paving {
    use super::*;

    pub fn on(features: &Value) -> bool {
        path_bool(features, "paving.on")
    }
}

pub mod spawn {
    use super::*;

    /// Silences the periodic spawn failure diagnostics.
    pub fn mute(features: &Value) -> bool {
        path_bool(features, "spawn.mute")
    }
}

pub mod intel {
    use super::*;

    pub fn store(features: &Value) -> bool {
        path_bool(features, "intel.store")
    }
}

pub mod gc {
    use super::*;

    pub fn on(features: &Value) -> bool {
        path_bool(features, "gc.on")
    }
}

//! Transpiler configuration.

use serde::{Deserialize, Serialize};

/// Transpiler options - only essential user settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranspileOptions {
    /// Carry source comments through to the generated Lua
    #[serde(default = "default_true")]
    pub preserve_comments: bool,
    /// Name of the sandbox helper table the generated code targets
    /// (`util.keys`, `util.split`, ...)
    #[serde(default = "default_helper_table")]
    pub helper_table: String,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            preserve_comments: true,
            helper_table: default_helper_table(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_helper_table() -> String {
    "util".to_string()
}

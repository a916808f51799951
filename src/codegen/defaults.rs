// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Process-wide generator defaults.
//!
//! Set at most once, before any generation starts; read by every worker
//! afterwards. Code that never calls [`init_defaults`] sees the built-in values.

use once_cell::sync::OnceCell;

/// Import path of the tracing helper package used by generated decorators.
pub const DEFAULT_TRACING_IMPORT: &str = "github.com/tuanvm-tyson/ddtrace/tracing";

/// Name written into the generated-file header and `//go:generate` directive.
pub const DEFAULT_TOOL_NAME: &str = "ddtrace";

pub const DEFAULT_TOOL_URL: &str = "http://github.com/tuanvm-tyson/ddtrace";

static DEFAULTS: OnceCell<GeneratorDefaults> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorDefaults {
    pub tracing_import: String,
    pub tool_name: String,
    pub tool_url: String,
}

impl Default for GeneratorDefaults {
    fn default() -> Self {
        Self {
            tracing_import: DEFAULT_TRACING_IMPORT.to_string(),
            tool_name: DEFAULT_TOOL_NAME.to_string(),
            tool_url: DEFAULT_TOOL_URL.to_string(),
        }
    }
}

/// Install the process defaults. Fails, returning the rejected value, once
/// defaults have been set or read.
pub fn init_defaults(defaults: GeneratorDefaults) -> Result<(), GeneratorDefaults> {
    DEFAULTS.set(defaults)
}

/// The process defaults.
pub fn defaults() -> &'static GeneratorDefaults {
    DEFAULTS.get_or_init(GeneratorDefaults::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_set_once() {
        let first = defaults().clone();
        let rejected = init_defaults(GeneratorDefaults {
            tracing_import: "example.com/other/tracing".to_string(),
            ..GeneratorDefaults::default()
        });
        assert!(rejected.is_err());
        assert_eq!(defaults(), &first);
    }
}

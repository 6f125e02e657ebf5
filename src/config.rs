use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::registry::{INITIAL_RENDER, RENDER};
use crate::validate::{CompilerError, ERR_CONFIG};

/// Read-only settings consumed by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// `build()` becomes `initialRender()` when set, `render()` otherwise.
    pub partial_update_mode: bool,
    /// Plain `forEach`/`if` emission instead of the reactive runtime protocol.
    #[serde(rename = "pureJavaScript")]
    pub pure_javascript: bool,
    pub generate_source_map: bool,
    /// Re-parse emitted JavaScript and report syntax problems as warnings.
    pub check_output: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            partial_update_mode: true,
            pure_javascript: false,
            generate_source_map: true,
            check_output: false,
        }
    }
}

impl CompilerConfig {
    pub fn from_json(json: &str) -> Result<Self, CompilerError> {
        serde_json::from_str(json).map_err(|e| {
            CompilerError::new(
                ERR_CONFIG,
                &format!("Invalid compiler configuration: {}", e),
                "",
                e.line() as u32,
                e.column() as u32,
            )
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, CompilerError> {
        let display = path.to_string_lossy();
        let data = fs::read_to_string(path).map_err(|e| {
            CompilerError::in_file(
                ERR_CONFIG,
                &format!("Failed to read configuration: {}", e),
                &display,
            )
        })?;
        Self::from_json(&data).map_err(|mut e| {
            e.file = display.to_string();
            e
        })
    }

    pub fn render_method_name(&self) -> &'static str {
        if self.partial_update_mode {
            INITIAL_RENDER
        } else {
            RENDER
        }
    }

    /// Stable text used to key cached output on configuration.
    pub fn fingerprint(&self) -> String {
        format!(
            "partial={};pure={};map={};check={}",
            self.partial_update_mode,
            self.pure_javascript,
            self.generate_source_map,
            self.check_output
        )
    }
}

//! Per-file compilation.
//!
//! Stages run strictly in order on one tree: decorator rewriting, then the
//! build-method rewrite, then code generation. Each stage relies on what the
//! previous one left in the tree.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::ast::SourceFile;
use crate::build_method::BuildMethodTransformer;
use crate::codegen::CodeGenerator;
use crate::config::CompilerConfig;
use crate::decorators::DecoratorTransformer;
use crate::parse::SourceParser;
use crate::source_map::{output_file_name, SourceMap};
use crate::validate::{check_output_syntax, CompilerError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    pub code: String,
    /// JSON text of the companion source map, when enabled.
    pub source_map: Option<String>,
    /// Non-fatal findings. Every entry here has already been logged.
    pub diagnostics: Vec<CompilerError>,
}

impl CompileOutput {
    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_warning())
    }
}

/// Runs every stage over an already parsed tree.
pub fn compile_ast(mut file: SourceFile, config: &CompilerConfig) -> CompileOutput {
    let file_name = file.file_name.clone();

    let mut decorators = DecoratorTransformer::new(&file_name);
    decorators.transform(&mut file);
    let mut diagnostics = decorators.into_diagnostics();
    debug!("[{}] decorator stage done", file_name);

    BuildMethodTransformer::new(config).transform(&mut file);
    debug!("[{}] build stage done", file_name);

    let code = CodeGenerator::new(config).generate(&file);
    debug!("[{}] generated {} bytes", file_name, code.len());

    if config.check_output {
        let found = check_output_syntax(&code, &file_name);
        for warning in &found {
            warn!("[{}] {}", file_name, warning.message);
        }
        diagnostics.extend(found);
    }

    let source_map = config
        .generate_source_map
        .then(|| SourceMap::new(&output_file_name(&file_name), &file_name).to_json());

    CompileOutput {
        code,
        source_map,
        diagnostics,
    }
}

/// Parses `source` with `parser` and compiles the result.
pub fn compile_source(
    source: &str,
    file_path: &str,
    config: &CompilerConfig,
    parser: &dyn SourceParser,
) -> Result<CompileOutput, CompilerError> {
    let file = parser.parse(source, file_path)?;
    debug!("[{}] parsed {} statements", file_path, file.statements.len());
    Ok(compile_ast(file, config))
}

use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_PARSE: &str = "ETS-ERR-PARSE";
pub const ERR_IO: &str = "ETS-ERR-IO";
pub const ERR_AST_JSON: &str = "ETS-ERR-AST-JSON";
pub const ERR_CONFIG: &str = "ETS-ERR-CONFIG";
pub const ERR_NO_CONVERTER: &str = "ETS-ERR-NO-CONVERTER";
pub const ERR_PANIC: &str = "ETS-ERR-PANIC";
pub const ERR_OUTPUT_COLLISION: &str = "ETS-ERR-OUTPUT-COLLISION";
pub const WARN_ENTRY_NOT_STRUCT: &str = "ETS-WARN-ENTRY-NOT-STRUCT";
pub const WARN_ENTRY_WITHOUT_COMPONENT: &str = "ETS-WARN-ENTRY-WITHOUT-COMPONENT";
pub const WARN_OUTPUT_SYNTAX: &str = "ETS-WARN-OUTPUT-SYNTAX";

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_PARSE => "Every source file yields a complete tree or a failure for that file only.",
        ERR_IO => "I/O failures affect only the file being read or written.",
        ERR_AST_JSON => "Externally supplied trees must match the node model exactly.",
        ERR_CONFIG => "Configuration is validated before any file is compiled.",
        ERR_NO_CONVERTER => "Unsupported constructs pass through as source text.",
        ERR_PANIC => "A crash while compiling one file never aborts sibling files.",
        ERR_OUTPUT_COLLISION => "No output file is written by more than one input.",
        WARN_ENTRY_NOT_STRUCT | WARN_ENTRY_WITHOUT_COMPONENT => {
            "Decorator misuse is reported and compilation continues."
        }
        WARN_OUTPUT_SYNTAX => "Emitted JavaScript is checked when output checking is enabled.",
        _ => "Unknown diagnostic.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{code}: {message} ({file}:{line}:{column})")]
pub struct CompilerError {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::with_details(code, message, file, line, column, None, vec![])
    }

    pub fn with_details(
        code: &str,
        message: &str,
        file: &str,
        line: u32,
        column: u32,
        context: Option<String>,
        hints: Vec<String>,
    ) -> Self {
        let severity = if code.contains("-WARN-") {
            Severity::Warning
        } else {
            Severity::Error
        };
        CompilerError {
            code: code.to_string(),
            severity,
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            file: file.to_string(),
            line,
            column,
            context,
            hints,
        }
    }

    /// Diagnostic without a source position.
    pub fn in_file(code: &str, message: &str, file: &str) -> Self {
        Self::new(code, message, file, 0, 0)
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl From<std::io::Error> for CompilerError {
    fn from(e: std::io::Error) -> Self {
        CompilerError::in_file(ERR_IO, &e.to_string(), "")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT CHECK
// ═══════════════════════════════════════════════════════════════════════════════

/// Parses emitted JavaScript as an ES module and reports each syntax error as
/// a warning.
pub fn check_output_syntax(js: &str, file: &str) -> Vec<CompilerError> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(true);
    let ret = Parser::new(&allocator, js, source_type).parse();

    ret.errors
        .iter()
        .map(|e| {
            CompilerError::with_details(
                WARN_OUTPUT_SYNTAX,
                &e.to_string(),
                file,
                0,
                0,
                None,
                vec!["Raw statements are passed through without type erasure.".to_string()],
            )
        })
        .collect()
}

/// Position of byte `offset` in `source` as 1-based line and column.
pub fn line_column(source: &str, offset: usize) -> (u32, u32) {
    let prefix = &source[..offset.min(source.len())];
    let line = prefix.matches('\n').count() as u32 + 1;
    let column = match prefix.rfind('\n') {
        Some(nl) => (prefix.len() - nl) as u32,
        None => prefix.len() as u32 + 1,
    };
    (line, column)
}

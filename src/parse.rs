//! Parse Module for the ETS compiler
//!
//! Turns ETS source text into the `ast` node model. The scanner is structural:
//! it recognizes declarations, decorators, class members and the statement
//! shapes the UI transforms care about (`if`/`else`, `ForEach`, component calls
//! with child blocks). Everything else is carried as source text.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::ast::{
    Block, ClassDeclaration, Decorator, ExportStatement, ExpressionStatement, ForeachStatement,
    IfStatement, ImportSpecifier, ImportStatement, Member, MethodDeclaration, MethodKind,
    Parameter, PropertyDeclaration, SourceFile, Statement, Visibility,
};
use crate::scan::{find_matching, find_top_level, skip_comment, skip_opaque, split_top_level};
use crate::validate::{line_column, CompilerError, ERR_AST_JSON, ERR_NO_CONVERTER, ERR_PARSE};

/// Contract between the pipeline and whatever produces its input tree.
pub trait SourceParser {
    fn parse(&self, source: &str, file_path: &str) -> Result<SourceFile, CompilerError>;
}

/// Reads ETS source text directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct EtsParser;

/// Reads a `SourceFile` serialized as JSON by an external parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonAstParser;

impl SourceParser for EtsParser {
    fn parse(&self, source: &str, file_path: &str) -> Result<SourceFile, CompilerError> {
        let mut cursor = Cursor::new(source, file_path, 0, source.len());
        let statements = cursor.parse_module()?;
        debug!("parse: {} top-level statements in {}", statements.len(), file_path);
        Ok(SourceFile {
            file_name: file_path.to_string(),
            statements,
        })
    }
}

impl SourceParser for JsonAstParser {
    fn parse(&self, source: &str, file_path: &str) -> Result<SourceFile, CompilerError> {
        parse_ast_json(source, file_path)
    }
}

pub fn parse_ast_json(json: &str, file_path: &str) -> Result<SourceFile, CompilerError> {
    let mut file: SourceFile = serde_json::from_str(json).map_err(|e| {
        CompilerError::new(
            ERR_AST_JSON,
            &format!("Invalid AST JSON: {}", e),
            file_path,
            e.line() as u32,
            e.column() as u32,
        )
    })?;
    if file.file_name.is_empty() {
        file.file_name = file_path.to_string();
    }
    Ok(file)
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATTERNS
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_$#][A-Za-z0-9_$]*").unwrap();
    static ref UI_CALL_HEAD_RE: Regex = Regex::new(r"^[A-Z][A-Za-z0-9_$]*\s*\(").unwrap();
    static ref CHAIN_CALL_RE: Regex = Regex::new(r"^\.\s*[A-Za-z_$][A-Za-z0-9_$]*\s*\(").unwrap();
    static ref TYPE_ALIAS_RE: Regex = Regex::new(r"^type\s+[A-Za-z_$][A-Za-z0-9_$]*\s*[=<]").unwrap();
    static ref IMPORT_FROM_RE: Regex =
        Regex::new(r#"(?s)^import\s+(.*?)\s*from\s*['"]([^'"]+)['"]"#).unwrap();
    static ref IMPORT_BARE_RE: Regex = Regex::new(r#"^import\s*['"]([^'"]+)['"]"#).unwrap();
    static ref HERITAGE_EXTENDS_RE: Regex =
        Regex::new(r"\bextends\s+([A-Za-z_$][A-Za-z0-9_$.]*)").unwrap();
}

/// Statement keywords whose text is passed through unchanged.
const RAW_KEYWORDS: [&str; 16] = [
    "let", "const", "var", "return", "throw", "break", "continue", "for", "while", "do",
    "switch", "try", "function", "async", "debugger", "enum",
];

const MEMBER_MODIFIERS: [&str; 10] = [
    "public", "private", "protected", "static", "readonly", "declare", "abstract", "override",
    "accessor", "async",
];

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Ensures pass-through statement text ends like a complete JS statement.
fn raw_statement(text: &str) -> Statement {
    let text = text.trim();
    if text.ends_with(';') || text.ends_with('}') {
        Statement::raw(text)
    } else {
        Statement::raw(&format!("{};", text))
    }
}

fn strip_semicolon(text: &str) -> &str {
    let text = text.trim();
    text.strip_suffix(';').map(str::trim_end).unwrap_or(text)
}

/// Top-level `=` that is an assignment, not part of `=>`, `==`, `<=`, ...
fn find_assignment(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(next) = skip_opaque(bytes, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b'=' if depth == 0 => {
                let next = bytes.get(i + 1).copied();
                let prev = if i > 0 { bytes[i - 1] } else { b' ' };
                if next != Some(b'>')
                    && next != Some(b'=')
                    && !matches!(prev, b'=' | b'!' | b'<' | b'>')
                {
                    return Some(i);
                }
                if next == Some(b'=') || next == Some(b'>') {
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn parse_parameter(text: &str) -> Parameter {
    let mut text = text.trim();
    loop {
        let stripped = ["public ", "private ", "protected ", "readonly "]
            .iter()
            .find_map(|m| text.strip_prefix(m));
        match stripped {
            Some(rest) => text = rest.trim_start(),
            None => break,
        }
    }

    let (head, default_value) = match find_assignment(text) {
        Some(eq) => (&text[..eq], Some(text[eq + 1..].trim().to_string())),
        None => (text, None),
    };
    let (name, type_annotation) = match find_top_level(head, b':') {
        Some(colon) => (&head[..colon], Some(head[colon + 1..].trim().to_string())),
        None => (head, None),
    };

    Parameter {
        name: name.trim().trim_end_matches('?').trim().to_string(),
        type_annotation,
        default_value,
    }
}

fn parse_import(text: &str) -> Statement {
    let text = strip_semicolon(text);
    if let Some(caps) = IMPORT_BARE_RE.captures(text) {
        return Statement::Import(ImportStatement::side_effect(&caps[1]));
    }
    let caps = match IMPORT_FROM_RE.captures(text) {
        Some(caps) => caps,
        None => return raw_statement(text),
    };

    let mut clause = caps[1].trim();
    let mut import = ImportStatement::side_effect(&caps[2]);
    if let Some(rest) = clause.strip_prefix("type ") {
        import.type_only = true;
        clause = rest.trim();
    }

    for part in split_top_level(clause, b',') {
        if let Some(ns) = part.strip_prefix('*') {
            let ns = ns.trim().trim_start_matches("as").trim();
            import.namespace_import = Some(ns.to_string());
        } else if part.starts_with('{') {
            let inner = part.trim_start_matches('{').trim_end_matches('}');
            for specifier in split_top_level(inner, b',') {
                if specifier.starts_with("type ") {
                    continue;
                }
                let mut words = specifier.split_whitespace();
                let name = words.next().unwrap_or_default().to_string();
                let alias = match (words.next(), words.next()) {
                    (Some("as"), Some(alias)) => Some(alias.to_string()),
                    _ => None,
                };
                import.specifiers.push(ImportSpecifier { name, alias });
            }
        } else {
            import.default_import = Some(part.to_string());
        }
    }

    // Only type specifiers were listed
    if import.default_import.is_none()
        && import.namespace_import.is_none()
        && import.specifiers.is_empty()
        && clause.starts_with('{')
    {
        import.type_only = true;
    }

    Statement::Import(import)
}

// ═══════════════════════════════════════════════════════════════════════════════
// CURSOR
// ═══════════════════════════════════════════════════════════════════════════════

/// A position inside `src[..end]`. Positions are absolute so diagnostics can
/// always be mapped back to the file.
struct Cursor<'s> {
    src: &'s str,
    file: &'s str,
    pos: usize,
    end: usize,
}

impl<'s> Cursor<'s> {
    fn new(src: &'s str, file: &'s str, pos: usize, end: usize) -> Self {
        Self { src, file, pos, end }
    }

    fn sub(&self, start: usize, end: usize) -> Cursor<'s> {
        Cursor::new(self.src, self.file, start, end)
    }

    fn bytes(&self) -> &'s [u8] {
        &self.src.as_bytes()[..self.end]
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..self.end]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn error(&self, at: usize, message: &str) -> CompilerError {
        let (line, column) = line_column(self.src, at);
        CompilerError::new(ERR_PARSE, message, self.file, line, column)
    }

    fn skip_trivia(&mut self) {
        let bytes = self.bytes();
        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if let Some(next) = skip_comment(bytes, self.pos) {
                self.pos = next;
            } else {
                break;
            }
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let rest = self.rest();
        rest.starts_with(keyword)
            && !rest
                .as_bytes()
                .get(keyword.len())
                .is_some_and(|b| is_ident_byte(*b))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            self.skip_trivia();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<&'s str> {
        let m = IDENT_RE.find(self.rest())?;
        let start = self.pos;
        self.pos += m.end();
        Some(&self.src[start..self.pos])
    }

    fn matching(&self, open: usize) -> Result<usize, CompilerError> {
        find_matching(&self.src[..self.end], open)
            .ok_or_else(|| self.error(open, "Unbalanced bracket"))
    }

    /// Skips a `<...>` type parameter list if one starts here.
    fn skip_type_params(&mut self) {
        if self.peek() != Some(b'<') {
            return;
        }
        let bytes = self.bytes();
        let mut depth = 0usize;
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'<' => depth += 1,
                b'>' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.pos += 1;
                        break;
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        self.skip_trivia();
    }

    /// End of the statement starting at `start`: just past a top-level `;`,
    /// or at a line break the statement cannot continue across.
    fn statement_end(&self, start: usize) -> Result<usize, CompilerError> {
        let bytes = self.bytes();
        let mut i = start;
        let mut last: Option<u8> = None;
        let mut before_last: Option<u8> = None;

        while i < bytes.len() {
            let b = bytes[i];
            if b == b'/' {
                if let Some(next) = skip_comment(bytes, i) {
                    i = next;
                    continue;
                }
            }
            if matches!(b, b'\'' | b'"' | b'`') {
                i = skip_opaque(bytes, i).unwrap_or(bytes.len());
                before_last = last;
                last = Some(b'"');
                continue;
            }
            match b {
                b';' => return Ok(i + 1),
                b'(' | b'[' | b'{' => {
                    i = self.matching(i)? + 1;
                    before_last = last;
                    last = Some(match b {
                        b'(' => b')',
                        b'[' => b']',
                        _ => b'}',
                    });
                    continue;
                }
                b')' | b']' | b'}' => {
                    return Err(self.error(i, &format!("Unexpected '{}'", b as char)));
                }
                b'\n' => {
                    if !self.continues_after_newline(last, before_last, i, start) {
                        return Ok(i);
                    }
                }
                b if b.is_ascii_whitespace() => {}
                _ => {
                    before_last = last;
                    last = Some(b);
                }
            }
            i += 1;
        }
        Ok(bytes.len())
    }

    /// End of a construct that finished just before `from`: past a `;` on the
    /// same line, or at the line break. `None` when more code follows on the
    /// same line.
    fn line_tail_end(&self, from: usize) -> Option<usize> {
        let bytes = self.bytes();
        let mut i = from;
        while i < bytes.len() {
            match bytes[i] {
                b';' => return Some(i + 1),
                b'\n' => return Some(i),
                b' ' | b'\t' | b'\r' => i += 1,
                _ => match skip_comment(bytes, i) {
                    Some(next) => i = next,
                    None => return None,
                },
            }
        }
        Some(bytes.len())
    }

    fn continues_after_newline(
        &self,
        last: Option<u8>,
        before_last: Option<u8>,
        newline: usize,
        start: usize,
    ) -> bool {
        let last = match last {
            Some(b) => b,
            None => return true,
        };
        let increment = matches!((before_last, last), (Some(b'+'), b'+') | (Some(b'-'), b'-'));
        if !increment && b",=+-*/%&|^!~?:.".contains(&last) {
            return true;
        }
        // `>` closes generic types far more often than it compares
        if last == b'>' && before_last == Some(b'=') {
            return true;
        }

        let mut ahead = self.sub(newline, self.end);
        ahead.skip_trivia();
        let next = ahead.rest();
        if next.starts_with("...") {
            return false;
        }
        if next.starts_with('.')
            || next.starts_with("?")
            || next.starts_with("&&")
            || next.starts_with("||")
            || next.starts_with("=>")
            || next.starts_with(',')
            || (next.starts_with('=') && !next.starts_with("=="))
        {
            return true;
        }
        if last == b'}' {
            let keyword_follows = ["else", "catch", "finally"]
                .iter()
                .any(|k| ahead.peek_keyword(k));
            let do_while = ahead.peek_keyword("while") && self.src[start..].starts_with("do");
            return keyword_follows || do_while;
        }
        false
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MODULE LEVEL
    // ═══════════════════════════════════════════════════════════════════════════

    fn parse_module(&mut self) -> Result<Vec<Statement>, CompilerError> {
        let mut out = Vec::new();
        loop {
            self.skip_trivia();
            if self.at_end() {
                break;
            }
            if self.peek() == Some(b';') {
                self.pos += 1;
                continue;
            }
            self.parse_top_level(&mut out)?;
        }
        Ok(out)
    }

    fn is_type_only_declaration(&self) -> bool {
        self.peek_keyword("interface")
            || self.peek_keyword("declare")
            || TYPE_ALIAS_RE.is_match(self.rest())
    }

    fn is_class_start(&self) -> bool {
        self.peek_keyword("struct")
            || self.peek_keyword("class")
            || (self.peek_keyword("abstract") && self.rest()[8..].trim_start().starts_with("class"))
    }

    fn take_statement_text(&mut self) -> Result<&'s str, CompilerError> {
        let start = self.pos;
        let end = self.statement_end(start)?;
        self.pos = end;
        Ok(self.src[start..end].trim())
    }

    fn parse_top_level(&mut self, out: &mut Vec<Statement>) -> Result<(), CompilerError> {
        if self.peek_keyword("import") && !self.rest()[6..].trim_start().starts_with('(') {
            let text = self.take_statement_text()?;
            out.push(parse_import(text));
            return Ok(());
        }

        let decorators = self.parse_decorators()?;

        if self.peek_keyword("export") {
            return self.parse_export(decorators, out);
        }
        if self.is_class_start() {
            let class = self.parse_class(decorators, false)?;
            out.push(Statement::Class(class));
            return Ok(());
        }
        if self.is_type_only_declaration() {
            let text = self.take_statement_text()?;
            debug!("parse: erased type declaration '{}'", first_line(text));
            return Ok(());
        }
        if !decorators.is_empty() {
            // e.g. a global `@Builder function`
            let err = CompilerError::in_file(
                ERR_NO_CONVERTER,
                "Decorators are only converted on classes and class members",
                self.file,
            );
            debug!("parse: {}", err.message);
        }

        if let Some(statement) = self.parse_statement()? {
            out.push(statement);
        }
        Ok(())
    }

    fn parse_export(
        &mut self,
        mut decorators: Vec<Decorator>,
        out: &mut Vec<Statement>,
    ) -> Result<(), CompilerError> {
        self.eat_keyword("export");
        let is_default = self.eat_keyword("default");
        decorators.extend(self.parse_decorators()?);

        if self.is_class_start() {
            let mut class = self.parse_class(decorators, true)?;
            let name = class.name.clone();
            let has_entry = class.has_decorator("Entry");
            if is_default && !has_entry {
                class.is_export = false;
                out.push(Statement::Class(class));
                out.push(Statement::raw(&format!("export default {};", name)));
            } else {
                out.push(Statement::Class(class));
            }
            return Ok(());
        }

        let type_only = self.is_type_only_declaration() || self.peek_keyword("type");
        let text = self.take_statement_text()?;
        let text = if is_default {
            format!("default {}", text)
        } else {
            text.to_string()
        };
        out.push(Statement::Export(ExportStatement {
            declaration: Box::new(raw_statement(&text)),
            type_only,
        }));
        Ok(())
    }

    fn parse_decorators(&mut self) -> Result<Vec<Decorator>, CompilerError> {
        let mut decorators = Vec::new();
        while self.peek() == Some(b'@') {
            self.pos += 1;
            let name = self
                .ident()
                .ok_or_else(|| self.error(self.pos, "Expected decorator name"))?;
            let mut decorator = Decorator::new(name);

            let after_name = self.pos;
            while self.peek().is_some_and(|b| b == b' ' || b == b'\t') {
                self.pos += 1;
            }
            if self.peek() == Some(b'(') {
                let close = self.matching(self.pos)?;
                let args = split_top_level(&self.src[self.pos + 1..close], b',');
                decorator.arguments = args
                    .into_iter()
                    .enumerate()
                    .map(|(i, a)| (i.to_string(), a))
                    .collect::<IndexMap<_, _>>();
                self.pos = close + 1;
            } else {
                self.pos = after_name;
            }
            decorators.push(decorator);
            self.skip_trivia();
        }
        Ok(decorators)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CLASSES
    // ═══════════════════════════════════════════════════════════════════════════

    fn parse_class(
        &mut self,
        decorators: Vec<Decorator>,
        is_export: bool,
    ) -> Result<ClassDeclaration, CompilerError> {
        self.eat_keyword("abstract");
        let is_struct = self.peek_keyword("struct");
        if !self.eat_keyword("struct") {
            self.eat_keyword("class");
        }

        let name_at = self.pos;
        let name = self
            .ident()
            .ok_or_else(|| self.error(name_at, "Expected class name"))?;
        self.skip_trivia();
        self.skip_type_params();

        let open = match self.rest().find('{') {
            Some(offset) => self.pos + offset,
            None => return Err(self.error(self.pos, "Expected '{' to open class body")),
        };
        let heritage = &self.src[self.pos..open];
        let close = self.matching(open)?;

        let mut class = ClassDeclaration::new(name);
        class.decorators = decorators;
        class.is_struct = is_struct;
        class.is_export = is_export;
        class.super_class = HERITAGE_EXTENDS_RE
            .captures(heritage)
            .map(|c| c[1].to_string());

        let mut body = self.sub(open + 1, close);
        class.members = body.parse_members()?;
        self.pos = close + 1;
        Ok(class)
    }

    fn parse_members(&mut self) -> Result<Vec<Member>, CompilerError> {
        let mut members = Vec::new();
        loop {
            self.skip_trivia();
            if self.at_end() {
                break;
            }
            if self.peek() == Some(b';') {
                self.pos += 1;
                continue;
            }
            let start = self.pos;
            match self.parse_member()? {
                Ok(Some(member)) => members.push(member),
                Ok(None) => {}
                Err(no_converter) => {
                    debug!("parse: {} at {}", no_converter.message, no_converter.line);
                    self.pos = self.statement_end(start)?.max(start + 1);
                }
            }
        }
        Ok(members)
    }

    /// Outer error: the file cannot be parsed. Inner error: this member has no
    /// conversion and is skipped.
    #[allow(clippy::type_complexity)]
    fn parse_member(&mut self) -> Result<Result<Option<Member>, CompilerError>, CompilerError> {
        let decorators = self.parse_decorators()?;

        let mut visibility = None;
        let mut is_static = false;
        let mut readonly = false;
        let mut is_async = false;
        loop {
            let modifier = MEMBER_MODIFIERS.iter().find(|m| {
                self.peek_keyword(m) && {
                    let after = self.rest()[m.len()..].trim_start();
                    after
                        .as_bytes()
                        .first()
                        .is_some_and(|b| is_ident_byte(*b) || *b == b'#' || *b == b'[')
                }
            });
            let modifier = match modifier {
                Some(m) => *m,
                None => break,
            };
            match modifier {
                "public" => visibility = Some(Visibility::Public),
                "private" => visibility = Some(Visibility::Private),
                "protected" => visibility = Some(Visibility::Protected),
                "static" => is_static = true,
                "readonly" => readonly = true,
                "async" => is_async = true,
                _ => {}
            }
            self.eat_keyword(modifier);
        }

        let mut kind = MethodKind::Method;
        for (keyword, accessor) in [("get", MethodKind::Getter), ("set", MethodKind::Setter)] {
            if self.peek_keyword(keyword) {
                let after = self.rest()[keyword.len()..].trim_start();
                if IDENT_RE.is_match(after) {
                    self.eat_keyword(keyword);
                    kind = accessor;
                }
            }
        }

        let name_at = self.pos;
        let name = match self.ident() {
            Some(name) => name,
            None => {
                let (line, column) = line_column(self.src, name_at);
                return Ok(Err(CompilerError::new(
                    ERR_NO_CONVERTER,
                    "Unsupported class member",
                    self.file,
                    line,
                    column,
                )));
            }
        };
        if name == "constructor" && kind == MethodKind::Method {
            kind = MethodKind::Constructor;
        }
        if matches!(self.peek(), Some(b'?') | Some(b'!')) {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
        self.skip_type_params();

        if self.peek() == Some(b'(') {
            let method = self.parse_method_rest(name, kind, decorators, is_static, is_async)?;
            return Ok(Ok(method.map(Member::Method)));
        }

        let decl_start = self.pos;
        let end = match self.line_tail_end(decl_start) {
            Some(end) => end,
            None => self.statement_end(decl_start)?,
        };
        self.pos = end;
        let decl = strip_semicolon(&self.src[decl_start..end]);

        let (head, initializer) = match find_assignment(decl) {
            Some(eq) => (&decl[..eq], Some(decl[eq + 1..].trim().to_string())),
            None => (decl, None),
        };
        let type_annotation = head
            .trim()
            .strip_prefix(':')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Ok(Some(Member::Property(PropertyDeclaration {
            name: name.to_string(),
            type_annotation,
            initializer,
            decorators,
            visibility,
            readonly,
            is_static,
        }))))
    }

    fn parse_method_rest(
        &mut self,
        name: &str,
        kind: MethodKind,
        decorators: Vec<Decorator>,
        is_static: bool,
        is_async: bool,
    ) -> Result<Option<MethodDeclaration>, CompilerError> {
        let open = self.pos;
        let close = self.matching(open)?;
        let parameters = split_top_level(&self.src[open + 1..close], b',')
            .iter()
            .map(|p| parse_parameter(p))
            .collect();
        self.pos = close + 1;
        self.skip_trivia();

        let mut return_type = None;
        if self.peek() == Some(b':') {
            let after_colon = self.pos + 1;
            let body_open = self.find_body_open(after_colon);
            return_type = Some(self.src[after_colon..body_open].trim().to_string());
            self.pos = body_open;
            self.skip_trivia();
        }

        if self.peek() != Some(b'{') {
            // Overload signature or abstract member
            self.pos = self.statement_end(self.pos)?;
            return Ok(None);
        }

        let body_close = self.matching(self.pos)?;
        let mut body = self.sub(self.pos + 1, body_close);
        let statements = body.parse_statements()?;
        self.pos = body_close + 1;

        Ok(Some(MethodDeclaration {
            name: name.to_string(),
            kind,
            parameters,
            return_type,
            decorators,
            body: Some(Block::new(statements)),
            is_async,
            is_static,
        }))
    }

    /// First `{` or `;` outside parentheses and brackets after a return type.
    fn find_body_open(&self, from: usize) -> usize {
        let bytes = self.bytes();
        let mut depth = 0usize;
        let mut i = from;
        while i < bytes.len() {
            match bytes[i] {
                b'(' | b'[' | b'<' => depth += 1,
                b')' | b']' => depth = depth.saturating_sub(1),
                b'>' if i > 0 && bytes[i - 1] != b'=' => depth = depth.saturating_sub(1),
                b'{' | b';' | b'\n' if depth == 0 => return i,
                _ => {}
            }
            i += 1;
        }
        bytes.len()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STATEMENTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn parse_statements(&mut self) -> Result<Vec<Statement>, CompilerError> {
        let mut out = Vec::new();
        loop {
            self.skip_trivia();
            if self.at_end() {
                break;
            }
            if self.peek() == Some(b';') {
                self.pos += 1;
                continue;
            }
            if let Some(statement) = self.parse_statement()? {
                out.push(statement);
            }
        }
        Ok(out)
    }

    fn parse_block_at(&mut self, open: usize) -> Result<Block, CompilerError> {
        let close = self.matching(open)?;
        let mut inner = self.sub(open + 1, close);
        let statements = inner.parse_statements()?;
        self.pos = close + 1;
        Ok(Block::new(statements))
    }

    /// A `{ ... }` block, or a single statement wrapped into one.
    fn parse_branch(&mut self) -> Result<Block, CompilerError> {
        self.skip_trivia();
        if self.peek() == Some(b'{') {
            return self.parse_block_at(self.pos);
        }
        Ok(Block::new(self.parse_statement()?.into_iter().collect()))
    }

    fn parse_statement(&mut self) -> Result<Option<Statement>, CompilerError> {
        self.skip_trivia();
        if self.at_end() {
            return Ok(None);
        }

        if self.peek_keyword("if") {
            return self.parse_if().map(Some);
        }
        if self.peek() == Some(b'{') {
            let block = self.parse_block_at(self.pos)?;
            return Ok(Some(Statement::Block(block)));
        }
        if self.peek_keyword("ForEach") || self.peek_keyword("LazyForEach") {
            let start = self.pos;
            match self.parse_for_each()? {
                Ok(statement) => return Ok(Some(Statement::ForEach(statement))),
                Err(no_converter) => {
                    debug!("parse: {}", no_converter.message);
                    self.pos = start;
                }
            }
        }
        if UI_CALL_HEAD_RE.is_match(self.rest()) {
            return self.parse_ui_call().map(Some);
        }

        let start = self.pos;
        let text = self.take_statement_text()?;
        if text.is_empty() {
            self.pos = self.pos.max(start + 1);
            return Ok(None);
        }
        let mut ahead = self.sub(start, self.end);
        if RAW_KEYWORDS.iter().any(|k| ahead.eat_keyword(k)) {
            return Ok(Some(raw_statement(text)));
        }
        Ok(Some(Statement::expression(strip_semicolon(text))))
    }

    fn parse_if(&mut self) -> Result<Statement, CompilerError> {
        self.eat_keyword("if");
        if self.peek() != Some(b'(') {
            return Err(self.error(self.pos, "Expected '(' after 'if'"));
        }
        let close = self.matching(self.pos)?;
        let condition = self.src[self.pos + 1..close].trim().to_string();
        self.pos = close + 1;
        let then_block = self.parse_branch()?;

        let saved = self.pos;
        self.skip_trivia();
        let else_block = if self.eat_keyword("else") {
            if self.peek_keyword("if") {
                Some(Block::new(vec![self.parse_if()?]))
            } else {
                Some(self.parse_branch()?)
            }
        } else {
            self.pos = saved;
            None
        };

        Ok(Statement::If(IfStatement {
            condition,
            then_block,
            else_block,
        }))
    }

    /// Inner error: fewer than two arguments, no conversion applies.
    fn parse_for_each(
        &mut self,
    ) -> Result<Result<ForeachStatement, CompilerError>, CompilerError> {
        let lazy = self.peek_keyword("LazyForEach");
        self.eat_keyword(if lazy { "LazyForEach" } else { "ForEach" });
        if self.peek() != Some(b'(') {
            return Ok(Err(CompilerError::in_file(
                ERR_NO_CONVERTER,
                "ForEach without call arguments",
                self.file,
            )));
        }
        let open = self.pos;
        let close = self.matching(open)?;
        let args = split_top_level(&self.src[open + 1..close], b',');
        if args.len() < 2 {
            return Ok(Err(CompilerError::in_file(
                ERR_NO_CONVERTER,
                "ForEach needs an array and an item generator",
                self.file,
            )));
        }
        self.pos = self.line_tail_end(close + 1).unwrap_or(close + 1);

        Ok(Ok(ForeachStatement {
            array_expr: args[0].clone(),
            item_generator: args[1].clone(),
            key_generator: args.get(2).cloned(),
            lazy,
        }))
    }

    /// `Name(args)`, then any mix of `.attr(args)` calls and one `{ ... }`
    /// child block.
    fn parse_ui_call(&mut self) -> Result<Statement, CompilerError> {
        let start = self.pos;
        let open = start + self.rest().find('(').unwrap_or(0);
        let mut cursor = self.matching(open)? + 1;
        let mut children: Option<(usize, usize)> = None;

        loop {
            let mut ahead = self.sub(cursor, self.end);
            ahead.skip_trivia();
            if ahead.peek() == Some(b'{') && children.is_none() {
                let close = self.matching(ahead.pos)?;
                children = Some((ahead.pos, close));
                cursor = close + 1;
                continue;
            }
            if let Some(m) = CHAIN_CALL_RE.find(ahead.rest()) {
                let call_open = ahead.pos + m.end() - 1;
                cursor = self.matching(call_open)? + 1;
                continue;
            }
            break;
        }

        // Anything else on the line after the chain means this is a larger
        // expression; take it whole.
        let end = match self.line_tail_end(cursor) {
            Some(end) => end,
            None => {
                self.pos = start;
                let text = self.take_statement_text()?;
                return Ok(Statement::expression(strip_semicolon(text)));
            }
        };
        self.pos = end;

        match children {
            None => Ok(Statement::expression(strip_semicolon(&self.src[start..cursor]))),
            Some((open, close)) => {
                let mut inner = self.sub(open + 1, close);
                let block = Block::new(inner.parse_statements()?);
                let expression = format!(
                    "{}{}",
                    self.src[start..open].trim_end(),
                    self.src[close + 1..cursor].trim()
                );
                Ok(Statement::Expression(ExpressionStatement::with_children(
                    &expression,
                    block,
                )))
            }
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

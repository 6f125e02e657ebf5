//! `ForEach` and `If` emission in reactive and plain-JavaScript modes.

use crate::ast::{ForeachStatement, IfStatement};
use crate::codegen::CodeGenerator;
use crate::registry::{ITEM_GEN_FUNCTION, KEY_GEN_FUNCTION};
use crate::scan::{find_matching, find_top_level, split_top_level};

/// Branch ids reported to the runtime for the two arms of an `If`.
pub const THEN_BRANCH_ID: u32 = 0;
pub const ELSE_BRANCH_ID: u32 = 1;

impl CodeGenerator<'_> {
    /// `scoped` wraps the reactive form in `{ }` so other loops in the same
    /// function scope do not redeclare the generator constants.
    pub(crate) fn emit_for_each(&mut self, node: &ForeachStatement, scoped: bool) {
        if !self.reactive() {
            self.lines(&format!(
                "{}.forEach({});",
                node.array_expr.trim(),
                strip_arrow_types(&node.item_generator)
            ));
            return;
        }

        if scoped {
            self.line("{");
            self.indented(|g| g.emit_reactive_for_each(node));
            self.line("}");
        } else {
            self.emit_reactive_for_each(node);
        }
    }

    fn emit_reactive_for_each(&mut self, node: &ForeachStatement) {
        let runtime = if node.lazy { "LazyForEach" } else { "ForEach" };

        self.line(&format!("{}.create();", runtime));
        self.lines(&format!(
            "const {} = {};",
            ITEM_GEN_FUNCTION,
            strip_arrow_types(&node.item_generator)
        ));
        if let Some(key_gen) = node.key_generator() {
            self.lines(&format!("const {} = {};", KEY_GEN_FUNCTION, strip_arrow_types(key_gen)));
            self.line(&format!("{}.keyGenerator({});", runtime, KEY_GEN_FUNCTION));
        }
        self.line(&format!("{}.itemGenerator({});", runtime, ITEM_GEN_FUNCTION));
        self.line(&format!("{}.pop();", runtime));
    }

    pub(crate) fn emit_if(&mut self, node: &IfStatement) {
        if self.reactive() {
            self.emit_reactive_if(node);
        } else {
            self.emit_plain_if(node);
        }
    }

    fn emit_plain_if(&mut self, node: &IfStatement) {
        self.line(&format!("if ({}) {{", node.condition.trim()));
        self.indented(|g| g.emit_scope(&node.then_block));
        match &node.else_block {
            Some(else_block) if node.has_else() => {
                self.line("} else {");
                self.indented(|g| g.emit_scope(else_block));
                self.line("}");
            }
            _ => self.line("}"),
        }
    }

    fn emit_reactive_if(&mut self, node: &IfStatement) {
        self.line("If.create();");
        self.line(&format!("if ({}) {{", node.condition.trim()));
        self.indented(|g| {
            g.line(&format!("If.branchId({});", THEN_BRANCH_ID));
            g.emit_scope(&node.then_block);
        });
        match &node.else_block {
            Some(else_block) if node.has_else() => {
                self.line("} else {");
                self.indented(|g| {
                    g.line(&format!("If.branchId({});", ELSE_BRANCH_ID));
                    g.emit_scope(else_block);
                });
                self.line("}");
            }
            _ => self.line("}"),
        }
        self.line("If.pop();");
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// GENERATOR TYPE ERASURE
// ═══════════════════════════════════════════════════════════════════════════

/// Drops TypeScript annotations from the parameters and return type of an
/// arrow function, so `(item: Item, i?: number): void => ...` becomes
/// `(item, i) => ...`. Anything else is returned trimmed but unchanged.
pub fn strip_arrow_types(generator: &str) -> String {
    let text = generator.trim();
    if !text.starts_with('(') {
        return text.to_string();
    }
    let close = match find_matching(text, 0) {
        Some(close) => close,
        None => return text.to_string(),
    };

    let after = text[close + 1..].trim_start();
    let body = if let Some(body) = after.strip_prefix("=>") {
        body
    } else if after.starts_with(':') {
        match after.find("=>") {
            Some(arrow) => &after[arrow + 2..],
            None => return text.to_string(),
        }
    } else {
        return text.to_string();
    };

    let params: Vec<String> = join_type_arguments(split_top_level(&text[1..close], b','))
        .iter()
        .map(|p| strip_parameter_type(p))
        .collect();
    format!("({}) =>{}", params.join(", "), body)
}

/// `name?: Type = value` becomes `name = value`.
fn strip_parameter_type(param: &str) -> String {
    let default = find_default(param);
    let colon = match find_top_level(param, b':') {
        Some(colon) if default.map_or(true, |d| colon < d) => colon,
        _ => return param.to_string(),
    };
    let name = param[..colon].trim().trim_end_matches('?').trim_end();
    match default {
        Some(eq) => format!("{} = {}", name, param[eq + 1..].trim()),
        None => name.to_string(),
    }
}

/// Position of a top-level assignment `=`, skipping `=>` and comparisons.
fn find_default(param: &str) -> Option<usize> {
    let bytes = param.as_bytes();
    let mut from = 0;
    while let Some(at) = find_top_level(&param[from..], b'=') {
        let i = from + at;
        let next = bytes.get(i + 1).copied();
        let prev = if i > 0 { Some(bytes[i - 1]) } else { None };
        if !matches!(next, Some(b'>' | b'=')) && !matches!(prev, Some(b'=' | b'!' | b'<' | b'>')) {
            return Some(i);
        }
        from = i + 1;
    }
    None
}

/// Rejoins pieces split inside type arguments such as `Map<string, number>`.
fn join_type_arguments(pieces: Vec<String>) -> Vec<String> {
    let mut joined: Vec<String> = Vec::new();
    for piece in pieces {
        match joined.last_mut() {
            Some(last) if open_angles(last) > 0 => {
                last.push_str(", ");
                last.push_str(&piece);
            }
            _ => joined.push(piece),
        }
    }
    joined
}

fn open_angles(text: &str) -> isize {
    let opens = text.matches('<').count() as isize;
    let closes = text.replace("=>", "").matches('>').count() as isize;
    opens - closes
}

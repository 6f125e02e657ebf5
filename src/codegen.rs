//! JavaScript emission for a transformed `SourceFile`.
//!
//! Output is built line by line with an explicit depth counter; each nested
//! block increments it on entry and decrements it on exit, so identical input
//! always produces byte-identical output.

use crate::ast::{
    Block, ClassDeclaration, ComponentStatement, ExpressionStatement, Member, MethodDeclaration,
    MethodKind, Parameter, PropertyDeclaration, SourceFile, Statement,
};
use crate::config::CompilerConfig;
use crate::recognizer::{recognize_builder_call, recognize_component, BuilderCall};

pub const INDENT: &str = "  ";

pub struct CodeGenerator<'a> {
    pub(crate) config: &'a CompilerConfig,
    out: String,
    pub(crate) depth: usize,
    /// Whether emission is currently inside a component class.
    pub(crate) inside_component: bool,
    /// Builder method names of the class currently being emitted.
    builder_names: Vec<String>,
    /// Whether the current function scope holds more than one reactive
    /// `ForEach`, and more than one builder call.
    scoped_loops: bool,
    scoped_builders: bool,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(config: &'a CompilerConfig) -> Self {
        Self {
            config,
            out: String::new(),
            depth: 0,
            inside_component: false,
            builder_names: Vec::new(),
            scoped_loops: false,
            scoped_builders: false,
        }
    }

    /// Imports first, then every other top-level statement in source order.
    pub fn generate(mut self, file: &SourceFile) -> String {
        let mut wrote_import = false;
        for statement in &file.statements {
            if let Statement::Import(import) = statement {
                let code = import.render();
                if !code.is_empty() {
                    self.line(&code);
                    wrote_import = true;
                }
            }
        }
        if wrote_import {
            self.line("");
        }

        for statement in &file.statements {
            if matches!(statement, Statement::Import(_)) {
                continue;
            }
            self.emit_statement(statement);
            if is_class_like(statement) {
                self.line("");
            }
        }

        let trimmed = self.out.trim_end();
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}\n", trimmed)
        }
    }

    /// Emits one statement at the current depth into a standalone string.
    pub fn generate_statement(mut self, statement: &Statement) -> String {
        self.emit_statement(statement);
        self.out
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LINE OUTPUT
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    /// Writes possibly multi-line source text at the current depth. Lines after
    /// the first keep their indentation relative to each other.
    pub(crate) fn lines(&mut self, text: &str) {
        let mut iter = text.trim().lines();
        let first = match iter.next() {
            Some(first) => first,
            None => return,
        };
        let rest: Vec<&str> = iter.collect();
        let common = rest
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.len() - l.trim_start().len())
            .min()
            .unwrap_or(0);

        self.line(first.trim_end());
        for l in rest {
            if l.trim().is_empty() {
                self.line("");
            } else {
                self.line(l[common.min(l.len())..].trim_end());
            }
        }
    }

    pub(crate) fn indented<F: FnOnce(&mut Self)>(&mut self, f: F) {
        self.depth += 1;
        f(self);
        self.depth -= 1;
    }

    /// Reactive control flow applies inside component classes unless plain
    /// JavaScript output is requested.
    pub(crate) fn reactive(&self) -> bool {
        self.inside_component && !self.config.pure_javascript
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STATEMENTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn emit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Import(import) => {
                let code = import.render();
                if !code.is_empty() {
                    self.line(&code);
                }
            }
            Statement::Export(export) => {
                if export.type_only {
                    return;
                }
                match export.declaration.as_ref() {
                    Statement::Class(class) => self.emit_class(class, true),
                    other => {
                        let start = self.out.len();
                        self.emit_statement(other);
                        if self.out.len() > start {
                            let at = start + self.depth * INDENT.len();
                            self.out.insert_str(at, "export ");
                        }
                    }
                }
            }
            Statement::Class(class) => self.emit_class(class, class.is_export),
            Statement::Expression(expr) => self.emit_expression(expr, self.scoped_builders),
            Statement::Component(component) => self.emit_component(component),
            Statement::ForEach(for_each) => self.emit_for_each(for_each, self.scoped_loops),
            Statement::If(if_stmt) => self.emit_if(if_stmt),
            Statement::Block(block) => {
                self.line("{");
                self.indented(|g| g.emit_scope(block));
                self.line("}");
            }
            Statement::Raw(raw) => self.lines(&raw.code),
        }
    }

    /// Emits the statements of `block` at the current depth, inside the
    /// current function scope.
    pub(crate) fn emit_block(&mut self, block: &Block) {
        for statement in &block.statements {
            self.emit_statement(statement);
        }
    }

    /// Emits `block` as the body of a new brace scope.
    ///
    /// Reactive `ForEach`s and builder calls each declare a fixed `const`
    /// name. Component children open no braces, so when the scope holds more
    /// than one of either kind at any nesting depth, every occurrence gets its
    /// own `{ }`.
    pub(crate) fn emit_scope(&mut self, block: &Block) {
        let (loops, builders) = self.generator_counts(block);
        let saved = (self.scoped_loops, self.scoped_builders);
        self.scoped_loops = loops > 1;
        self.scoped_builders = builders > 1;
        self.emit_block(block);
        (self.scoped_loops, self.scoped_builders) = saved;
    }

    /// Reactive loops and builder calls declared directly in the scope of
    /// `block`, including those nested in component children.
    fn generator_counts(&self, block: &Block) -> (usize, usize) {
        let mut loops = 0;
        let mut builders = 0;
        for statement in &block.statements {
            let children = match statement {
                Statement::ForEach(_) => {
                    loops += 1;
                    None
                }
                Statement::Expression(e) if self.builder_call(e).is_some() => {
                    builders += 1;
                    None
                }
                Statement::Expression(e) if recognize_component(&e.expression).is_some() => {
                    e.children.as_ref()
                }
                Statement::Component(c) => c.children.as_ref(),
                _ => None,
            };
            if let Some(children) = children {
                let (l, b) = self.generator_counts(children);
                loops += l;
                builders += b;
            }
        }
        (loops, builders)
    }

    fn builder_call(&self, expr: &ExpressionStatement) -> Option<BuilderCall> {
        recognize_builder_call(&expr.expression, &self.builder_names)
    }

    /// Builder call, then UI component, then the expression text itself.
    fn emit_expression(&mut self, expr: &ExpressionStatement, scoped: bool) {
        if let Some(call) = self.builder_call(expr) {
            let statements = call.statements();
            if scoped {
                self.line("{");
                self.indented(|g| statements.iter().for_each(|s| g.line(s)));
                self.line("}");
            } else {
                statements.iter().for_each(|s| self.line(s));
            }
            return;
        }

        if let Some(mut component) = recognize_component(&expr.expression) {
            component.children = expr.children.clone();
            self.emit_component(&component);
            return;
        }

        let text = expr.expression.trim();
        if text.is_empty() {
            return;
        }
        if text.ends_with(';') || text.ends_with('}') || text.starts_with('{') {
            self.lines(text);
        } else {
            self.lines(&format!("{};", text));
        }

        if let Some(children) = &expr.children {
            self.line("{");
            self.indented(|g| g.emit_scope(children));
            self.line("}");
        }
    }

    pub(crate) fn emit_component(&mut self, component: &ComponentStatement) {
        let name = &component.component_name;
        self.line(&format!("{}.create({});", name, component.create_args));
        for method in &component.methods {
            self.line(&format!("{}.{};", name, method));
        }
        if let Some(children) = &component.children {
            self.indented(|g| g.emit_block(children));
        }
        self.line(&format!("{}.pop();", name));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CLASSES
    // ═══════════════════════════════════════════════════════════════════════════

    fn emit_class(&mut self, class: &ClassDeclaration, exported: bool) {
        let saved_inside = self.inside_component;
        // `__builder__` is only injected into component classes.
        let builders = if class.is_component() {
            class.builder_method_names()
        } else {
            Vec::new()
        };
        let saved_builders = std::mem::replace(&mut self.builder_names, builders);
        self.inside_component = class.is_component();

        for decorator in &class.decorators {
            if decorator.name != "Component" {
                self.line(&format!("// @{}", decorator.name));
            }
        }

        let prefix = match (exported, class.has_decorator("Entry")) {
            (true, true) => "export default ",
            (true, false) => "export ",
            (false, _) => "",
        };
        let extends = class
            .super_class
            .as_ref()
            .map(|s| format!(" extends {}", s))
            .unwrap_or_default();
        self.line(&format!("{}class {}{} {{", prefix, class.name, extends));

        self.indented(|g| {
            let mut previous_was_method = false;
            for (i, member) in class.members.iter().enumerate() {
                let is_method = matches!(member, Member::Method(_));
                if i > 0 && (is_method || previous_was_method) {
                    g.line("");
                }
                match member {
                    Member::Property(p) => g.emit_property(p),
                    Member::Method(m) => g.emit_method(m),
                }
                previous_was_method = is_method;
            }
        });
        self.line("}");

        self.inside_component = saved_inside;
        self.builder_names = saved_builders;
    }

    fn emit_property(&mut self, prop: &PropertyDeclaration) {
        let keyword = if prop.is_static { "static " } else { "" };
        match &prop.initializer {
            Some(init) => self.lines(&format!("{}{} = {};", keyword, prop.name, init.trim())),
            None => self.line(&format!("{}{};", keyword, prop.name)),
        }
    }

    fn emit_method(&mut self, method: &MethodDeclaration) {
        let params = render_parameters(&method.parameters);
        let header = match method.kind {
            MethodKind::Constructor => format!("constructor({}) {{", params),
            MethodKind::Getter => format!("get {}() {{", method.name),
            MethodKind::Setter => format!("set {}({}) {{", method.name, params),
            MethodKind::Method => {
                let mut header = String::new();
                if method.is_static {
                    header.push_str("static ");
                }
                if method.is_async {
                    header.push_str("async ");
                }
                header.push_str(&format!("{}({}) {{", method.name, params));
                header
            }
        };
        self.line(&header);
        if let Some(body) = &method.body {
            self.indented(|g| g.emit_scope(body));
        }
        self.line("}");
    }
}

fn is_class_like(statement: &Statement) -> bool {
    match statement {
        Statement::Class(_) => true,
        Statement::Export(e) => matches!(e.declaration.as_ref(), Statement::Class(_)) && !e.type_only,
        _ => false,
    }
}

/// `name /* type */ = default`, comma separated.
pub fn render_parameters(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(|p| {
            let mut s = p.name.clone();
            if let Some(t) = &p.type_annotation {
                s.push_str(&format!(" /* {} */", t));
            }
            if let Some(d) = &p.default_value {
                s.push_str(&format!(" = {}", d));
            }
            s
        })
        .collect::<Vec<_>>()
        .join(", ")
}

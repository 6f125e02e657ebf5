//! Node model for one ETS source file.
//!
//! Every node is owned by exactly one parent; a `SourceFile` owns the whole
//! tree. The model derives serde so an external parser can hand the tree over
//! as JSON (see `parse::JsonAstParser`).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::registry::{self, DecoratorKind, StateDecorator};

/// Suffix appended to a reactive property's name to form its backing field.
pub const PRIVATE_PROPERTY_SUFFIX: &str = "__";

// ═══════════════════════════════════════════════════════════════════════════════
// FILE & STATEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub file_name: String,
    pub statements: Vec<Statement>,
}

impl SourceFile {
    pub fn new(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            statements: Vec::new(),
        }
    }

    pub fn has_imports(&self) -> bool {
        self.statements
            .iter()
            .any(|s| matches!(s, Statement::Import(_)))
    }
}

/// Closed set of statement kinds. The generator matches on this exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Statement {
    Import(ImportStatement),
    Export(ExportStatement),
    Class(ClassDeclaration),
    Expression(ExpressionStatement),
    Component(ComponentStatement),
    ForEach(ForeachStatement),
    If(IfStatement),
    Block(Block),
    /// Source text passed through as-is (declarations, loops, returns, ...).
    Raw(RawStatement),
}

impl Statement {
    pub fn expression(code: &str) -> Self {
        Statement::Expression(ExpressionStatement::new(code))
    }

    pub fn raw(code: &str) -> Self {
        Statement::Raw(RawStatement {
            code: code.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStatement {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionStatement {
    pub expression: String,
    /// Trailing `{ ... }` child block of a UI call such as `Column() { ... }`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Block>,
}

impl ExpressionStatement {
    pub fn new(expression: &str) -> Self {
        Self {
            expression: expression.to_string(),
            children: None,
        }
    }

    pub fn with_children(expression: &str, children: Block) -> Self {
        Self {
            expression: expression.to_string(),
            children: Some(children),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODULE STATEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSpecifier {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatement {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_import: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_import: Option<String>,
    #[serde(default)]
    pub specifiers: Vec<ImportSpecifier>,
    #[serde(default)]
    pub type_only: bool,
}

impl ImportStatement {
    pub fn side_effect(module: &str) -> Self {
        Self {
            module: module.to_string(),
            default_import: None,
            namespace_import: None,
            specifiers: Vec::new(),
            type_only: false,
        }
    }

    /// Renders the statement as JavaScript. Type-only imports render empty.
    pub fn render(&self) -> String {
        if self.type_only {
            return String::new();
        }

        let mut clauses = Vec::new();
        if let Some(default) = &self.default_import {
            clauses.push(default.clone());
        }
        if let Some(ns) = &self.namespace_import {
            clauses.push(format!("* as {}", ns));
        }
        if !self.specifiers.is_empty() {
            let named: Vec<String> = self
                .specifiers
                .iter()
                .map(|s| match &s.alias {
                    Some(alias) => format!("{} as {}", s.name, alias),
                    None => s.name.clone(),
                })
                .collect();
            clauses.push(format!("{{ {} }}", named.join(", ")));
        }

        if clauses.is_empty() {
            format!("import '{}';", self.module)
        } else {
            format!("import {} from '{}';", clauses.join(", "), self.module)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStatement {
    pub declaration: Box<Statement>,
    #[serde(default)]
    pub type_only: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECORATORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decorator {
    pub name: String,
    /// Free-form arguments. Positional arguments are keyed by index.
    #[serde(default)]
    pub arguments: IndexMap<String, String>,
}

impl Decorator {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            arguments: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> Option<DecoratorKind> {
        DecoratorKind::from_name(&self.name)
    }

    pub fn is_component_decorator(&self) -> bool {
        registry::COMPONENT_DECORATORS.contains(self.name.as_str())
    }

    pub fn is_state_decorator(&self) -> bool {
        registry::STATE_DECORATORS.contains(self.name.as_str())
    }

    pub fn is_method_decorator(&self) -> bool {
        registry::METHOD_DECORATORS.contains(self.name.as_str())
    }
}

fn has_decorator(decorators: &[Decorator], name: &str) -> bool {
    decorators.iter().any(|d| d.name == name)
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLASSES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDeclaration {
    pub name: String,
    #[serde(default)]
    pub decorators: Vec<Decorator>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub is_struct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_class: Option<String>,
    #[serde(default)]
    pub is_export: bool,
}

impl ClassDeclaration {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            decorators: Vec::new(),
            members: Vec::new(),
            is_struct: false,
            super_class: None,
            is_export: false,
        }
    }

    pub fn has_decorator(&self, name: &str) -> bool {
        has_decorator(&self.decorators, name)
    }

    /// True when any component-family decorator is attached.
    pub fn is_component(&self) -> bool {
        self.decorators.iter().any(Decorator::is_component_decorator)
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyDeclaration> {
        self.members.iter().filter_map(|m| match m {
            Member::Property(p) => Some(p),
            Member::Method(_) => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDeclaration> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(method) => Some(method),
            Member::Property(_) => None,
        })
    }

    pub fn methods_mut(&mut self) -> impl Iterator<Item = &mut MethodDeclaration> {
        self.members.iter_mut().filter_map(|m| match m {
            Member::Method(method) => Some(method),
            Member::Property(_) => None,
        })
    }

    pub fn builder_method_names(&self) -> Vec<String> {
        self.methods()
            .filter(|m| m.is_builder_method())
            .map(|m| m.name.clone())
            .collect()
    }

    pub fn constructor_mut(&mut self) -> Option<&mut MethodDeclaration> {
        self.methods_mut()
            .find(|m| m.kind == MethodKind::Constructor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "member", rename_all = "camelCase")]
pub enum Member {
    Property(PropertyDeclaration),
    Method(MethodDeclaration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    Public,
    Private,
    Protected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initializer: Option<String>,
    #[serde(default)]
    pub decorators: Vec<Decorator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub is_static: bool,
}

impl PropertyDeclaration {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_annotation: None,
            initializer: None,
            decorators: Vec::new(),
            visibility: None,
            readonly: false,
            is_static: false,
        }
    }

    pub fn has_decorator(&self, name: &str) -> bool {
        has_decorator(&self.decorators, name)
    }

    pub fn private_name(&self) -> String {
        format!("{}{}", self.name, PRIVATE_PROPERTY_SUFFIX)
    }

    /// The reactive decorator governing this property, first match wins.
    pub fn state_decorator(&self) -> Option<StateDecorator> {
        StateDecorator::resolve(&self.decorators)
    }

    /// Runtime wrapper type name; `ObservedPropertySimple` when undecorated.
    pub fn wrapper_type(&self) -> &'static str {
        self.state_decorator()
            .map(StateDecorator::wrapper_type)
            .unwrap_or(registry::OBSERVED_PROPERTY_SIMPLE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MethodKind {
    #[default]
    Method,
    Constructor,
    Getter,
    Setter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl Parameter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_annotation: None,
            default_value: None,
        }
    }

    pub fn typed(name: &str, type_annotation: &str) -> Self {
        Self {
            name: name.to_string(),
            type_annotation: Some(type_annotation.to_string()),
            default_value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDeclaration {
    pub name: String,
    #[serde(default)]
    pub kind: MethodKind,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default)]
    pub decorators: Vec<Decorator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Block>,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub is_static: bool,
}

impl MethodDeclaration {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: MethodKind::Method,
            parameters: Vec::new(),
            return_type: None,
            decorators: Vec::new(),
            body: None,
            is_async: false,
            is_static: false,
        }
    }

    pub fn constructor(body: Block) -> Self {
        Self {
            kind: MethodKind::Constructor,
            body: Some(body),
            ..Self::new("constructor")
        }
    }

    pub fn getter(name: &str, return_type: Option<String>, body: Block) -> Self {
        Self {
            kind: MethodKind::Getter,
            return_type,
            body: Some(body),
            ..Self::new(name)
        }
    }

    pub fn setter(name: &str, parameter: Parameter, body: Block) -> Self {
        Self {
            kind: MethodKind::Setter,
            parameters: vec![parameter],
            return_type: Some("void".to_string()),
            body: Some(body),
            ..Self::new(name)
        }
    }

    pub fn has_decorator(&self, name: &str) -> bool {
        has_decorator(&self.decorators, name)
    }

    pub fn is_build_method(&self) -> bool {
        self.kind == MethodKind::Method && self.name == "build"
    }

    pub fn is_builder_method(&self) -> bool {
        self.decorators
            .iter()
            .any(|d| d.kind() == Some(DecoratorKind::Builder))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// UI STATEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartKind {
    Create,
    Method,
    Pop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub kind: PartKind,
    pub code: String,
}

/// A recognized UI component call rewritten into the create/pop protocol.
///
/// The create arguments and attribute calls are stored separately so the
/// part sequence is always `CREATE, METHOD*, POP`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatement {
    pub component_name: String,
    pub create_args: String,
    /// Attribute calls in source order, e.g. `fontSize(16)`.
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Block>,
}

impl ComponentStatement {
    pub fn new(component_name: &str, create_args: &str) -> Self {
        Self {
            component_name: component_name.to_string(),
            create_args: create_args.to_string(),
            methods: Vec::new(),
            children: None,
        }
    }

    pub fn push_method(&mut self, name: &str, args: &str) {
        self.methods.push(format!("{}({})", name, args));
    }

    pub fn parts(&self) -> Vec<Part> {
        let mut parts = Vec::with_capacity(self.methods.len() + 2);
        parts.push(Part {
            kind: PartKind::Create,
            code: self.create_args.clone(),
        });
        parts.extend(self.methods.iter().map(|m| Part {
            kind: PartKind::Method,
            code: m.clone(),
        }));
        parts.push(Part {
            kind: PartKind::Pop,
            code: String::new(),
        });
        parts
    }

    pub fn has_children(&self) -> bool {
        self.children.as_ref().is_some_and(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeachStatement {
    pub array_expr: String,
    pub item_generator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_generator: Option<String>,
    /// `LazyForEach` source form; emitted through the same runtime protocol.
    #[serde(default)]
    pub lazy: bool,
}

impl ForeachStatement {
    pub fn new(array_expr: &str, item_generator: &str, key_generator: Option<&str>) -> Self {
        Self {
            array_expr: array_expr.to_string(),
            item_generator: item_generator.to_string(),
            key_generator: key_generator.map(str::to_string),
            lazy: false,
        }
    }

    /// The key generator, if one was supplied and is not blank.
    pub fn key_generator(&self) -> Option<&str> {
        self.key_generator
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IfStatement {
    pub condition: String,
    pub then_block: Block,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub else_block: Option<Block>,
}

impl IfStatement {
    pub fn new(condition: &str, then_block: Block, else_block: Option<Block>) -> Self {
        Self {
            condition: condition.to_string(),
            then_block,
            else_block,
        }
    }

    pub fn has_else(&self) -> bool {
        self.else_block.as_ref().is_some_and(|b| !b.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_parts_are_create_methods_pop() {
        let mut stmt = ComponentStatement::new("Button", "'Click'");
        stmt.push_method("fontSize", "16");
        stmt.push_method("width", "100");

        let parts = stmt.parts();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0].kind, PartKind::Create);
        assert_eq!(parts[0].code, "'Click'");
        assert_eq!(parts[1].code, "fontSize(16)");
        assert_eq!(parts[2].kind, PartKind::Method);
        assert_eq!(parts[3].kind, PartKind::Pop);
        assert_eq!(parts[3].code, "");
    }

    #[test]
    fn has_else_requires_non_empty_block() {
        let no_else = IfStatement::new("x", Block::default(), None);
        assert!(!no_else.has_else());

        let empty_else = IfStatement::new("x", Block::default(), Some(Block::default()));
        assert!(!empty_else.has_else());

        let real_else = IfStatement::new(
            "x",
            Block::default(),
            Some(Block::new(vec![Statement::expression("a()")])),
        );
        assert!(real_else.has_else());
    }

    #[test]
    fn wrapper_type_follows_first_state_decorator() {
        let mut prop = PropertyDeclaration::new("count");
        assert_eq!(prop.wrapper_type(), "ObservedPropertySimple");
        assert_eq!(prop.private_name(), "count__");

        prop.decorators.push(Decorator::new("Link"));
        assert_eq!(prop.wrapper_type(), "SynchedPropertySimpleTwoWay");

        prop.decorators.push(Decorator::new("Prop"));
        assert_eq!(prop.wrapper_type(), "SynchedPropertySimpleOneWay");

        prop.decorators.insert(0, Decorator::new("State"));
        assert_eq!(prop.wrapper_type(), "ObservedPropertySimple");
    }

    #[test]
    fn blank_key_generator_is_absent() {
        let stmt = ForeachStatement::new("this.items", "(item) => {}", Some("  "));
        assert_eq!(stmt.key_generator(), None);
    }

    #[test]
    fn import_render_covers_clause_shapes() {
        let mut import = ImportStatement::side_effect("./polyfill");
        assert_eq!(import.render(), "import './polyfill';");

        import.default_import = Some("router".to_string());
        import.specifiers.push(ImportSpecifier {
            name: "a".to_string(),
            alias: Some("b".to_string()),
        });
        assert_eq!(import.render(), "import router, { a as b } from './polyfill';");

        import.type_only = true;
        assert_eq!(import.render(), "");
    }

    #[test]
    fn statements_round_trip_through_tagged_json() {
        let json = r#"{"kind":"if","condition":"a","thenBlock":{"statements":[{"kind":"expression","expression":"Text('x')"}]}}"#;
        let stmt: Statement = serde_json::from_str(json).unwrap();
        match stmt {
            Statement::If(ifs) => {
                assert_eq!(ifs.condition, "a");
                assert!(!ifs.has_else());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

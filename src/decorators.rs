//! Decorator-driven class rewriting.
//!
//! A struct carrying a component-family decorator becomes a `View` subclass.
//! Each reactive property becomes a private backing field plus an accessor
//! pair, `@State` fields are initialized in a synthesized constructor, and
//! `@Builder` methods receive a leading builder parameter.

use log::{debug, warn};

use crate::ast::{
    Block, ClassDeclaration, Member, MethodDeclaration, MethodKind, Parameter,
    PropertyDeclaration, SourceFile, Statement, Visibility,
};
use crate::registry::{
    StateDecorator, BUILDER_PARAM, BUILDER_PARAM_NAME, CREATE_STATE, VIEW,
};
use crate::validate::{CompilerError, WARN_ENTRY_NOT_STRUCT, WARN_ENTRY_WITHOUT_COMPONENT};
use crate::visitor::{walk_source_file, AstVisitor};

pub struct DecoratorTransformer {
    file: String,
    diagnostics: Vec<CompilerError>,
}

impl DecoratorTransformer {
    pub fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            diagnostics: Vec::new(),
        }
    }

    pub fn transform(&mut self, file: &mut SourceFile) {
        walk_source_file(self, file);
    }

    pub fn into_diagnostics(self) -> Vec<CompilerError> {
        self.diagnostics
    }

    pub fn transform_class(&mut self, class: &mut ClassDeclaration) {
        if !class.is_component() {
            return;
        }
        debug!("decorators: rewriting {}", class.name);

        // 1. Entry implies export; misuse is reported, not fatal
        if class.has_decorator("Entry") {
            class.is_export = true;
            if !class.is_struct {
                self.warn(
                    WARN_ENTRY_NOT_STRUCT,
                    format!("@Entry on '{}' which is not a struct", class.name),
                );
            }
            if !class.has_decorator("Component") {
                self.warn(
                    WARN_ENTRY_WITHOUT_COMPONENT,
                    format!("@Entry on '{}' without @Component", class.name),
                );
            }
        }

        // 2. struct -> class extending View
        class.is_struct = false;
        class.super_class = Some(VIEW.to_string());

        // 3. State snapshot before any member is replaced
        let state_properties: Vec<PropertyDeclaration> = class
            .properties()
            .filter(|p| p.state_decorator() == Some(StateDecorator::State))
            .cloned()
            .collect();

        // 4. One transformer per reactive property, first match wins
        let members = std::mem::take(&mut class.members);
        for member in members {
            match member {
                Member::Property(prop) => match prop.state_decorator() {
                    Some(kind) => class.members.extend(expand_reactive_property(&prop, kind)),
                    None => class.members.push(Member::Property(prop)),
                },
                Member::Method(mut method) => {
                    if method.is_builder_method() {
                        inject_builder_param(&mut method);
                    }
                    class.members.push(Member::Method(method));
                }
            }
        }

        // 5. Constructor initializing every @State field
        if !state_properties.is_empty() {
            install_state_constructor(class, &state_properties);
        }
    }

    fn warn(&mut self, code: &str, message: String) {
        warn!("{}: {}", self.file, message);
        self.diagnostics
            .push(CompilerError::in_file(code, &message, &self.file));
    }
}

impl AstVisitor for DecoratorTransformer {
    fn visit_class(&mut self, class: &mut ClassDeclaration) {
        self.transform_class(class);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTY REWRITING
// ═══════════════════════════════════════════════════════════════════════════════

/// Backing field, getter and setter replacing one reactive property.
fn expand_reactive_property(prop: &PropertyDeclaration, kind: StateDecorator) -> [Member; 3] {
    let private_name = prop.private_name();
    let value_type = prop.type_annotation.clone();

    let backing = PropertyDeclaration {
        name: private_name.clone(),
        type_annotation: Some(format!(
            "{}<{}>",
            kind.wrapper_type(),
            value_type.as_deref().unwrap_or("any")
        )),
        initializer: if kind.keeps_initializer() {
            prop.initializer.clone()
        } else {
            None
        },
        decorators: prop.decorators.clone(),
        visibility: Some(Visibility::Private),
        readonly: false,
        is_static: prop.is_static,
    };

    let getter = MethodDeclaration::getter(
        &prop.name,
        value_type.clone(),
        Block::new(vec![Statement::raw(&format!(
            "return this.{}.get();",
            private_name
        ))]),
    );

    let value_param = match &value_type {
        Some(t) => Parameter::typed("newValue", t),
        None => Parameter::new("newValue"),
    };
    let setter = MethodDeclaration::setter(
        &prop.name,
        value_param,
        Block::new(vec![Statement::raw(&format!(
            "this.{}.set(newValue);",
            private_name
        ))]),
    );

    [
        Member::Property(backing),
        Member::Method(getter),
        Member::Method(setter),
    ]
}

fn state_init_line(prop: &PropertyDeclaration) -> String {
    format!(
        "this.{} = this.{}('{}', () => {});",
        prop.private_name(),
        CREATE_STATE,
        prop.name,
        prop.initializer.as_deref().unwrap_or("undefined")
    )
}

fn is_super_call(statement: &Statement) -> bool {
    let text = match statement {
        Statement::Raw(raw) => raw.code.as_str(),
        Statement::Expression(expr) => expr.expression.as_str(),
        _ => return false,
    };
    text.trim_start().starts_with("super(")
}

/// Puts a constructor first in the class: `super();` then one `createState`
/// line per state property. An existing constructor keeps its body and gets
/// the state lines after its `super(...)` call.
fn install_state_constructor(class: &mut ClassDeclaration, state_properties: &[PropertyDeclaration]) {
    let init: Vec<Statement> = state_properties
        .iter()
        .map(|p| Statement::raw(&state_init_line(p)))
        .collect();

    let existing = class
        .members
        .iter()
        .position(|m| matches!(m, Member::Method(method) if method.kind == MethodKind::Constructor));

    let constructor = match existing {
        Some(index) => match class.members.remove(index) {
            Member::Method(mut ctor) => {
                let body = ctor.body.get_or_insert_with(Block::default);
                match body.statements.iter().position(is_super_call) {
                    Some(at) => {
                        body.statements.splice(at + 1..at + 1, init);
                    }
                    None => {
                        let mut statements = vec![Statement::raw("super();")];
                        statements.extend(init);
                        statements.append(&mut body.statements);
                        body.statements = statements;
                    }
                }
                ctor
            }
            Member::Property(_) => return,
        },
        None => {
            let mut statements = vec![Statement::raw("super();")];
            statements.extend(init);
            MethodDeclaration::constructor(Block::new(statements))
        }
    };

    class.members.insert(0, Member::Method(constructor));
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDER METHODS
// ═══════════════════════════════════════════════════════════════════════════════

fn inject_builder_param(method: &mut MethodDeclaration) {
    if method
        .parameters
        .first()
        .is_some_and(|p| p.name == BUILDER_PARAM_NAME)
    {
        return;
    }
    method.parameters.insert(
        0,
        Parameter {
            name: BUILDER_PARAM_NAME.to_string(),
            type_annotation: Some(BUILDER_PARAM.to_string()),
            default_value: Some("undefined".to_string()),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Decorator;

    fn decorated(name: &str, decorator: &str, ty: &str, init: Option<&str>) -> Member {
        let mut prop = PropertyDeclaration::new(name);
        prop.decorators.push(Decorator::new(decorator));
        prop.type_annotation = Some(ty.to_string());
        prop.initializer = init.map(str::to_string);
        Member::Property(prop)
    }

    fn component(decorators: &[&str]) -> ClassDeclaration {
        let mut class = ClassDeclaration::new("App");
        class.is_struct = true;
        class.decorators = decorators.iter().map(|d| Decorator::new(d)).collect();
        class
    }

    fn member_names(class: &ClassDeclaration) -> Vec<String> {
        class
            .members
            .iter()
            .map(|m| match m {
                Member::Property(p) => format!("prop {}", p.name),
                Member::Method(m) => format!("{:?} {}", m.kind, m.name),
            })
            .collect()
    }

    fn constructor_lines(class: &ClassDeclaration) -> Vec<String> {
        match &class.members[0] {
            Member::Method(m) if m.kind == MethodKind::Constructor => m
                .body
                .as_ref()
                .unwrap()
                .statements
                .iter()
                .map(|s| match s {
                    Statement::Raw(r) => r.code.clone(),
                    other => panic!("unexpected {:?}", other),
                })
                .collect(),
            other => panic!("first member is not a constructor: {:?}", other),
        }
    }

    #[test]
    fn component_struct_becomes_view_subclass() {
        let mut class = component(&["Component"]);
        let mut transformer = DecoratorTransformer::new("app.ets");
        transformer.transform_class(&mut class);

        assert!(!class.is_struct);
        assert_eq!(class.super_class.as_deref(), Some("View"));
        assert!(!class.is_export);
        assert!(transformer.into_diagnostics().is_empty());
    }

    #[test]
    fn plain_classes_are_untouched() {
        let mut class = ClassDeclaration::new("Model");
        class.members.push(decorated("x", "State", "number", Some("1")));
        let before = class.clone();
        DecoratorTransformer::new("m.ets").transform_class(&mut class);
        assert_eq!(class, before);
    }

    #[test]
    fn state_property_expands_and_initializes_in_constructor() {
        let mut class = component(&["Component", "Entry"]);
        class.members.push(decorated("count", "State", "number", Some("0")));
        DecoratorTransformer::new("app.ets").transform_class(&mut class);

        assert!(class.is_export);
        assert_eq!(
            member_names(&class),
            vec!["Constructor constructor", "prop count__", "Getter count", "Setter count"]
        );
        assert_eq!(
            constructor_lines(&class),
            vec![
                "super();",
                "this.count__ = this.createState('count', () => 0);"
            ]
        );

        match &class.members[1] {
            Member::Property(p) => {
                assert_eq!(p.type_annotation.as_deref(), Some("ObservedPropertySimple<number>"));
                assert_eq!(p.visibility, Some(Visibility::Private));
                assert!(p.initializer.is_none());
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn uninitialized_state_uses_undefined() {
        let mut class = component(&["Component"]);
        class.members.push(decorated("name", "State", "string", None));
        DecoratorTransformer::new("a.ets").transform_class(&mut class);
        assert_eq!(
            constructor_lines(&class)[1],
            "this.name__ = this.createState('name', () => undefined);"
        );
    }

    #[test]
    fn prop_and_link_have_no_constructor_or_initializer() {
        let mut class = component(&["Component"]);
        class.members.push(decorated("title", "Prop", "string", Some("'x'")));
        class.members.push(decorated("value", "Link", "number", None));
        DecoratorTransformer::new("a.ets").transform_class(&mut class);

        assert_eq!(
            member_names(&class),
            vec![
                "prop title__",
                "Getter title",
                "Setter title",
                "prop value__",
                "Getter value",
                "Setter value"
            ]
        );
        match (&class.members[0], &class.members[3]) {
            (Member::Property(p), Member::Property(l)) => {
                assert_eq!(p.type_annotation.as_deref(), Some("SynchedPropertySimpleOneWay<string>"));
                assert!(p.initializer.is_none());
                assert_eq!(l.type_annotation.as_deref(), Some("SynchedPropertySimpleTwoWay<number>"));
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn provide_keeps_initializer() {
        let mut class = component(&["Component"]);
        class.members.push(decorated("theme", "Provide", "string", Some("'dark'")));
        DecoratorTransformer::new("a.ets").transform_class(&mut class);
        match &class.members[0] {
            Member::Property(p) => assert_eq!(p.initializer.as_deref(), Some("'dark'")),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn property_with_two_reactive_decorators_expands_once() {
        let mut class = component(&["Component"]);
        let mut prop = PropertyDeclaration::new("v");
        prop.decorators = vec![Decorator::new("Link"), Decorator::new("State")];
        class.members.push(Member::Property(prop));
        DecoratorTransformer::new("a.ets").transform_class(&mut class);

        let backing: Vec<_> = class.properties().collect();
        assert_eq!(backing.len(), 1);
        assert_eq!(backing[0].type_annotation.as_deref(), Some("ObservedPropertySimple<any>"));
        assert_eq!(constructor_lines(&class).len(), 2);
    }

    #[test]
    fn every_state_property_reaches_the_constructor() {
        let mut class = component(&["Component"]);
        class.members.push(decorated("a", "State", "number", Some("1")));
        class.members.push(decorated("b", "Prop", "number", None));
        class.members.push(decorated("c", "State", "number", Some("3")));
        DecoratorTransformer::new("a.ets").transform_class(&mut class);

        let lines = constructor_lines(&class);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("this.a__ ="));
        assert!(lines[2].starts_with("this.c__ ="));
    }

    #[test]
    fn existing_constructor_receives_state_lines_after_super() {
        let mut class = component(&["Component"]);
        class.members.push(decorated("a", "State", "number", Some("1")));
        class.members.push(Member::Method(MethodDeclaration::constructor(Block::new(vec![
            Statement::raw("super(parent);"),
            Statement::raw("this.ready = true;"),
        ]))));
        DecoratorTransformer::new("a.ets").transform_class(&mut class);

        assert_eq!(
            constructor_lines(&class),
            vec![
                "super(parent);",
                "this.a__ = this.createState('a', () => 1);",
                "this.ready = true;"
            ]
        );
        let constructors = class
            .methods()
            .filter(|m| m.kind == MethodKind::Constructor)
            .count();
        assert_eq!(constructors, 1);
    }

    #[test]
    fn entry_misuse_is_a_warning() {
        let mut class = component(&["Entry"]);
        class.is_struct = false;
        let mut transformer = DecoratorTransformer::new("a.ets");
        transformer.transform_class(&mut class);

        let codes: Vec<_> = transformer
            .into_diagnostics()
            .into_iter()
            .map(|d| d.code)
            .collect();
        assert_eq!(codes, vec![WARN_ENTRY_NOT_STRUCT, WARN_ENTRY_WITHOUT_COMPONENT]);
        assert_eq!(class.super_class.as_deref(), Some("View"));
        assert!(class.is_export);
    }

    #[test]
    fn builder_methods_get_leading_builder_param() {
        let mut class = component(&["Component"]);
        let mut method = MethodDeclaration::new("card");
        method.decorators.push(Decorator::new("Builder"));
        method.parameters.push(Parameter::typed("title", "string"));
        class.members.push(Member::Method(method));
        DecoratorTransformer::new("a.ets").transform_class(&mut class);

        let method = class.methods().next().unwrap();
        assert_eq!(method.parameters.len(), 2);
        assert_eq!(method.parameters[0].name, "__builder__");
        assert_eq!(method.parameters[0].type_annotation.as_deref(), Some("BuilderParam"));
        assert_eq!(method.parameters[0].default_value.as_deref(), Some("undefined"));
    }
}

//! Rewrites UI statements inside `build()` and `@Builder` bodies into the
//! create/pop form.
//!
//! Recognized component calls become `ComponentStatement`s with their child
//! blocks transformed recursively. Unrecognized calls stay expressions, and
//! their children are still visited. `If` branches are rewritten in place;
//! their reactive bookkeeping is emitted by the code generator.

use std::mem;

use crate::ast::{Block, ComponentStatement, ExpressionStatement, Statement};
use crate::recognizer::{is_component_call, recognize_component};
use crate::visitor::{walk_block, walk_statement, AstVisitor};

#[derive(Default)]
pub struct ComponentTransformer {
    pub converted: usize,
    pub declined: usize,
}

impl ComponentTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform_block(&mut self, block: &mut Block) {
        self.visit_block(block);
    }
}

impl AstVisitor for ComponentTransformer {
    fn visit_block(&mut self, block: &mut Block) {
        attach_trailing_blocks(block);
        walk_block(self, block);
    }

    fn visit_statement(&mut self, statement: &mut Statement) {
        if let Statement::Expression(expr) = statement {
            match into_component(expr) {
                Some(component) => {
                    *statement = Statement::Component(component);
                    self.converted += 1;
                }
                None if is_component_call(&expr.expression) => self.declined += 1,
                None => {}
            }
        }
        walk_statement(self, statement);
    }
}

fn into_component(expr: &mut ExpressionStatement) -> Option<ComponentStatement> {
    let mut component = recognize_component(&expr.expression)?;
    component.children = expr.children.take();
    Some(component)
}

/// Folds a bare `{ ... }` block into the preceding UI call as its children.
/// External parsers report `Column() { ... }` as two sibling statements.
fn attach_trailing_blocks(block: &mut Block) {
    let statements = mem::take(&mut block.statements);
    let mut out: Vec<Statement> = Vec::with_capacity(statements.len());

    for statement in statements {
        if let Statement::Block(children) = statement {
            match out.last_mut() {
                Some(Statement::Expression(prev))
                    if prev.children.is_none() && is_component_call(&prev.expression) =>
                {
                    prev.children = Some(children);
                }
                _ => out.push(Statement::Block(children)),
            }
        } else {
            out.push(statement);
        }
    }

    block.statements = out;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::IfStatement;

    fn expr(code: &str) -> Statement {
        Statement::expression(code)
    }

    fn component(stmt: &Statement) -> &ComponentStatement {
        match stmt {
            Statement::Component(c) => c,
            other => panic!("expected component, got {:?}", other),
        }
    }

    #[test]
    fn nested_containers_convert_recursively() {
        let inner = Block::new(vec![expr("Text('a')"), expr("Text('b').fontSize(12)")]);
        let row = ExpressionStatement::with_children("Row()", inner);
        let column = ExpressionStatement::with_children(
            "Column({ space: 8 }).width('100%')",
            Block::new(vec![Statement::Expression(row)]),
        );
        let mut body = Block::new(vec![Statement::Expression(column)]);

        let mut transformer = ComponentTransformer::new();
        transformer.transform_block(&mut body);

        let column = component(&body.statements[0]);
        assert_eq!(column.component_name, "Column");
        assert_eq!(column.methods, vec!["width('100%')"]);
        let row = component(&column.children.as_ref().unwrap().statements[0]);
        assert_eq!(row.component_name, "Row");
        let texts = &row.children.as_ref().unwrap().statements;
        assert_eq!(component(&texts[1]).methods, vec!["fontSize(12)"]);
        assert_eq!(transformer.converted, 4);
    }

    #[test]
    fn declined_calls_keep_children_and_children_still_convert() {
        let children = Block::new(vec![expr("Text('inside')")]);
        let mut body = Block::new(vec![Statement::Expression(ExpressionStatement::with_children(
            "Button(this.label)",
            children,
        ))]);

        let mut transformer = ComponentTransformer::new();
        transformer.transform_block(&mut body);

        match &body.statements[0] {
            Statement::Expression(e) => {
                assert_eq!(e.expression, "Button(this.label)");
                let inner = &e.children.as_ref().unwrap().statements[0];
                assert_eq!(component(inner).component_name, "Text");
            }
            other => panic!("{:?}", other),
        }
        assert_eq!(transformer.declined, 1);
    }

    #[test]
    fn if_branches_are_transformed() {
        let mut body = Block::new(vec![Statement::If(IfStatement::new(
            "this.flag",
            Block::new(vec![expr("Text('yes')")]),
            Some(Block::new(vec![expr("Text('no')")])),
        ))]);
        ComponentTransformer::new().transform_block(&mut body);

        match &body.statements[0] {
            Statement::If(ifs) => {
                component(&ifs.then_block.statements[0]);
                component(&ifs.else_block.as_ref().unwrap().statements[0]);
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn sibling_block_becomes_children() {
        let mut body = Block::new(vec![
            expr("Column()"),
            Statement::Block(Block::new(vec![expr("Text('a')")])),
            Statement::Block(Block::new(vec![expr("Text('b')")])),
        ]);
        ComponentTransformer::new().transform_block(&mut body);

        assert_eq!(body.len(), 2);
        assert!(component(&body.statements[0]).has_children());
        assert!(matches!(body.statements[1], Statement::Block(_)));
    }

    #[test]
    fn plain_statements_are_left_alone() {
        let mut body = Block::new(vec![expr("console.log('x')"), Statement::raw("let a = 1;")]);
        let before = body.clone();
        ComponentTransformer::new().transform_block(&mut body);
        assert_eq!(body, before);
    }
}

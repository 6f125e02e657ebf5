use crate::ast::{
    Block, ClassDeclaration, ComponentStatement, ExpressionStatement, ForeachStatement,
    IfStatement, Member, MethodDeclaration, PropertyDeclaration, SourceFile, Statement,
};

/// The AstVisitor trait is the single traversal mechanism transformers use
/// over a `SourceFile`.
///
/// Rules:
/// 1. Traversal order is source order and fixed.
/// 2. Implementers override `visit_*` methods to add behavior.
/// 3. Implementers MUST call the matching `walk_*` function to continue
///    traversal unless pruning is intended.
/// 4. Exports are transparent: a class under `export` is visited like any other.
pub trait AstVisitor {
    fn visit_source_file(&mut self, file: &mut SourceFile) {
        walk_source_file(self, file);
    }

    fn visit_statement(&mut self, statement: &mut Statement) {
        walk_statement(self, statement);
    }

    fn visit_class(&mut self, class: &mut ClassDeclaration) {
        walk_class(self, class);
    }

    fn visit_property(&mut self, _property: &mut PropertyDeclaration) {
        // Leaf
    }

    fn visit_method(&mut self, method: &mut MethodDeclaration) {
        walk_method(self, method);
    }

    fn visit_block(&mut self, block: &mut Block) {
        walk_block(self, block);
    }

    fn visit_expression(&mut self, expression: &mut ExpressionStatement) {
        walk_expression(self, expression);
    }

    fn visit_component(&mut self, component: &mut ComponentStatement) {
        walk_component(self, component);
    }

    fn visit_for_each(&mut self, _for_each: &mut ForeachStatement) {
        // Generators are opaque text
    }

    fn visit_if(&mut self, if_stmt: &mut IfStatement) {
        walk_if(self, if_stmt);
    }
}

pub fn walk_source_file<V: AstVisitor + ?Sized>(visitor: &mut V, file: &mut SourceFile) {
    for statement in &mut file.statements {
        visitor.visit_statement(statement);
    }
}

pub fn walk_statement<V: AstVisitor + ?Sized>(visitor: &mut V, statement: &mut Statement) {
    match statement {
        Statement::Import(_) | Statement::Raw(_) => {}
        Statement::Export(export) => visitor.visit_statement(&mut export.declaration),
        Statement::Class(class) => visitor.visit_class(class),
        Statement::Expression(expr) => visitor.visit_expression(expr),
        Statement::Component(component) => visitor.visit_component(component),
        Statement::ForEach(for_each) => visitor.visit_for_each(for_each),
        Statement::If(if_stmt) => visitor.visit_if(if_stmt),
        Statement::Block(block) => visitor.visit_block(block),
    }
}

pub fn walk_class<V: AstVisitor + ?Sized>(visitor: &mut V, class: &mut ClassDeclaration) {
    for member in &mut class.members {
        match member {
            Member::Property(p) => visitor.visit_property(p),
            Member::Method(m) => visitor.visit_method(m),
        }
    }
}

pub fn walk_method<V: AstVisitor + ?Sized>(visitor: &mut V, method: &mut MethodDeclaration) {
    if let Some(body) = &mut method.body {
        visitor.visit_block(body);
    }
}

pub fn walk_block<V: AstVisitor + ?Sized>(visitor: &mut V, block: &mut Block) {
    for statement in &mut block.statements {
        visitor.visit_statement(statement);
    }
}

pub fn walk_expression<V: AstVisitor + ?Sized>(visitor: &mut V, expression: &mut ExpressionStatement) {
    if let Some(children) = &mut expression.children {
        visitor.visit_block(children);
    }
}

pub fn walk_component<V: AstVisitor + ?Sized>(visitor: &mut V, component: &mut ComponentStatement) {
    if let Some(children) = &mut component.children {
        visitor.visit_block(children);
    }
}

pub fn walk_if<V: AstVisitor + ?Sized>(visitor: &mut V, if_stmt: &mut IfStatement) {
    visitor.visit_block(&mut if_stmt.then_block);
    if let Some(else_block) = &mut if_stmt.else_block {
        visitor.visit_block(else_block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        classes: usize,
        methods: usize,
        expressions: usize,
    }

    impl AstVisitor for Counter {
        fn visit_class(&mut self, class: &mut ClassDeclaration) {
            self.classes += 1;
            walk_class(self, class);
        }

        fn visit_method(&mut self, method: &mut MethodDeclaration) {
            self.methods += 1;
            walk_method(self, method);
        }

        fn visit_expression(&mut self, expression: &mut ExpressionStatement) {
            self.expressions += 1;
            walk_expression(self, expression);
        }
    }

    #[test]
    fn walks_through_exports_and_nested_blocks() {
        let mut method = MethodDeclaration::new("build");
        let inner = Block::new(vec![Statement::expression("Text('a')")]);
        method.body = Some(Block::new(vec![
            Statement::Expression(ExpressionStatement::with_children("Column()", inner)),
            Statement::If(IfStatement::new(
                "x",
                Block::new(vec![Statement::expression("Text('b')")]),
                None,
            )),
        ]));
        let mut class = ClassDeclaration::new("App");
        class.members.push(Member::Method(method));

        let mut file = SourceFile::new("app.ets");
        file.statements.push(Statement::Export(crate::ast::ExportStatement {
            declaration: Box::new(Statement::Class(class)),
            type_only: false,
        }));

        let mut counter = Counter::default();
        counter.visit_source_file(&mut file);
        assert_eq!(counter.classes, 1);
        assert_eq!(counter.methods, 1);
        assert_eq!(counter.expressions, 3);
    }
}

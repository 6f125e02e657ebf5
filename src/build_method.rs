//! Renames `build()` to the configured render entry point and rewrites UI
//! bodies of component classes.

use log::debug;

use crate::ast::{ClassDeclaration, MethodDeclaration, SourceFile};
use crate::config::CompilerConfig;
use crate::transform::ComponentTransformer;
use crate::visitor::{walk_source_file, AstVisitor};

pub struct BuildMethodTransformer<'a> {
    config: &'a CompilerConfig,
    components: ComponentTransformer,
}

impl<'a> BuildMethodTransformer<'a> {
    pub fn new(config: &'a CompilerConfig) -> Self {
        Self {
            config,
            components: ComponentTransformer::new(),
        }
    }

    pub fn transform(&mut self, file: &mut SourceFile) {
        walk_source_file(self, file);
        debug!(
            "build: {} component calls converted, {} left as expressions",
            self.components.converted, self.components.declined
        );
    }

    /// Renames a `build` method. The new name depends only on the mode flag.
    pub fn rename_build_method(&self, method: &mut MethodDeclaration) {
        if method.is_build_method() {
            method.name = self.config.render_method_name().to_string();
        }
    }

    pub fn transform_class(&mut self, class: &mut ClassDeclaration) {
        if !class.is_component() {
            return;
        }
        for method in class.methods_mut() {
            let is_build = method.is_build_method();
            if !is_build && !method.is_builder_method() {
                continue;
            }
            if is_build {
                self.rename_build_method(method);
            }
            if let Some(body) = &mut method.body {
                self.components.transform_block(body);
            }
        }
    }
}

impl AstVisitor for BuildMethodTransformer<'_> {
    fn visit_class(&mut self, class: &mut ClassDeclaration) {
        self.transform_class(class);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Block, Decorator, Member, Statement};

    fn component_with(method: MethodDeclaration) -> ClassDeclaration {
        let mut class = ClassDeclaration::new("App");
        class.decorators.push(Decorator::new("Component"));
        class.members.push(Member::Method(method));
        class
    }

    fn transformed_name(partial: bool, body: Option<Block>) -> String {
        let config = CompilerConfig {
            partial_update_mode: partial,
            ..CompilerConfig::default()
        };
        let mut method = MethodDeclaration::new("build");
        method.body = body;
        let mut class = component_with(method);
        BuildMethodTransformer::new(&config).transform_class(&mut class);
        let name = class.methods().next().unwrap().name.clone();
        name
    }

    #[test]
    fn name_depends_only_on_mode() {
        let bodies = [
            None,
            Some(Block::default()),
            Some(Block::new(vec![Statement::expression("Text('x')")])),
            Some(Block::new(vec![Statement::raw("return;")])),
        ];
        for body in bodies {
            assert_eq!(transformed_name(true, body.clone()), "initialRender");
            assert_eq!(transformed_name(false, body), "render");
        }
    }

    #[test]
    fn builder_bodies_are_rewritten_but_keep_their_name() {
        let config = CompilerConfig::default();
        let mut method = MethodDeclaration::new("header");
        method.decorators.push(Decorator::new("Builder"));
        method.body = Some(Block::new(vec![Statement::expression("Text('h')")]));
        let mut class = component_with(method);
        BuildMethodTransformer::new(&config).transform_class(&mut class);

        let method = class.methods().next().unwrap();
        assert_eq!(method.name, "header");
        assert!(matches!(
            method.body.as_ref().unwrap().statements[0],
            Statement::Component(_)
        ));
    }

    #[test]
    fn other_methods_and_non_components_are_untouched() {
        let config = CompilerConfig::default();
        let mut helper = MethodDeclaration::new("helper");
        helper.body = Some(Block::new(vec![Statement::expression("Text('x')")]));
        let mut class = component_with(helper);
        let mut plain = ClassDeclaration::new("Plain");
        let mut build = MethodDeclaration::new("build");
        build.body = Some(Block::new(vec![Statement::expression("Text('x')")]));
        plain.members.push(Member::Method(build));

        let before = (class.clone(), plain.clone());
        let mut transformer = BuildMethodTransformer::new(&config);
        transformer.transform_class(&mut class);
        transformer.transform_class(&mut plain);
        assert_eq!((class, plain), before);
    }
}

//! Text-level recognizers for expression statements.
//!
//! Both recognizers are total and pure: a given input always produces the
//! same answer, and "no match" is an ordinary `None` rather than an error.

use lazy_static::lazy_static;
use regex::Regex;

use crate::ast::ComponentStatement;
use crate::registry::{self, BUILDER_PARAM, BUILDER_PARAM_NAME};
use crate::scan::{find_matching, split_top_level};

lazy_static! {
    static ref COMPONENT_CALL_RE: Regex = Regex::new(r"^([A-Z][a-zA-Z0-9]*)\s*\(").unwrap();
    static ref CHAINED_CALL_RE: Regex =
        Regex::new(r"^\s*\.\s*([a-zA-Z_$][a-zA-Z0-9_$]*)\s*\(([^()]*)\)").unwrap();
    static ref BUILDER_CALL_RE: Regex =
        Regex::new(r"^this\s*\.\s*([a-zA-Z_$][a-zA-Z0-9_$]*)\s*\(").unwrap();
}

/// Substrings that need real expression analysis; the recognizer declines them.
const UNSUPPORTED_FRAGMENTS: [&str; 4] = ["this.", "$r(", "$rawfile(", "=>"];

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT CALLS
// ═══════════════════════════════════════════════════════════════════════════════

/// True when `expression` has the shape `UpperCaseIdentifier(...)`.
pub fn is_component_call(expression: &str) -> bool {
    COMPONENT_CALL_RE.is_match(expression.trim())
}

/// Recognizes `Name(args).attr(args)...` for a built-in component `Name`.
///
/// Declines on references to `this`, resource calls, arrow functions,
/// unregistered names, attribute arguments with nested parentheses, and any
/// trailing text that is not an attribute call.
pub fn recognize_component(expression: &str) -> Option<ComponentStatement> {
    let text = expression.trim();
    let caps = COMPONENT_CALL_RE.captures(text)?;

    if UNSUPPORTED_FRAGMENTS.iter().any(|f| text.contains(f)) {
        return None;
    }

    let name = caps.get(1)?.as_str();
    if !registry::is_builtin_component(name) {
        return None;
    }

    let open = caps.get(0)?.end() - 1;
    let close = find_matching(text, open)?;
    let mut statement = ComponentStatement::new(name, text[open + 1..close].trim());

    let mut rest = &text[close + 1..];
    while let Some(chain) = CHAINED_CALL_RE.captures(rest) {
        let method = chain.get(1)?.as_str();
        let args = chain.get(2)?.as_str().trim();
        statement.push_method(method, args);
        rest = &rest[chain.get(0)?.end()..];
    }

    match rest.trim() {
        "" | ";" => Some(statement),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDER CALLS
// ═══════════════════════════════════════════════════════════════════════════════

/// A `this.<builder>(args)` call on one of the current class's builder methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderCall {
    pub method: String,
    pub arguments: Vec<String>,
}

impl BuilderCall {
    /// Arguments of the rewritten call: the injected builder, then the originals.
    pub fn rewritten_arguments(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.arguments.len() + 1);
        args.push(BUILDER_PARAM_NAME.to_string());
        args.extend(self.arguments.iter().cloned());
        args
    }

    /// The three replacement statements, in order.
    pub fn statements(&self) -> [String; 3] {
        [
            format!("const {} = new {}();", BUILDER_PARAM_NAME, BUILDER_PARAM),
            format!(
                "this.{}({});",
                self.method,
                self.rewritten_arguments().join(", ")
            ),
            format!("{}.build();", BUILDER_PARAM_NAME),
        ]
    }
}

pub fn recognize_builder_call(expression: &str, builder_names: &[String]) -> Option<BuilderCall> {
    if builder_names.is_empty() {
        return None;
    }
    let text = expression.trim();
    let caps = BUILDER_CALL_RE.captures(text)?;
    let method = caps.get(1)?.as_str();
    if !builder_names.iter().any(|n| n == method) {
        return None;
    }

    let open = caps.get(0)?.end() - 1;
    let close = find_matching(text, open)?;
    match text[close + 1..].trim() {
        "" | ";" => {}
        _ => return None,
    }

    Some(BuilderCall {
        method: method.to_string(),
        arguments: split_top_level(&text[open + 1..close], b','),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PartKind;

    #[test]
    fn single_call_yields_create_then_pop() {
        let stmt = recognize_component("Text('Hello')").unwrap();
        assert_eq!(stmt.component_name, "Text");
        let parts = stmt.parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].kind, PartKind::Create);
        assert_eq!(parts[0].code, "'Hello'");
        assert_eq!(parts[1].kind, PartKind::Pop);
        assert_eq!(parts[1].code, "");
    }

    #[test]
    fn chained_attributes_become_method_parts() {
        let stmt = recognize_component("Button('Click').fontSize(16)").unwrap();
        let parts = stmt.parts();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].code, "'Click'");
        assert_eq!(parts[1].kind, PartKind::Method);
        assert_eq!(parts[1].code, "fontSize(16)");
        assert_eq!(parts[2].kind, PartKind::Pop);
    }

    #[test]
    fn multi_line_chain_is_accepted() {
        let stmt = recognize_component("Text('a')\n  .fontSize(20)\n  .fontColor(Color.Red)").unwrap();
        assert_eq!(stmt.methods, vec!["fontSize(20)", "fontColor(Color.Red)"]);
    }

    #[test]
    fn declines_unsupported_fragments() {
        assert!(recognize_component("Text(this.message)").is_none());
        assert!(recognize_component("Button('Click').onClick(() => {})").is_none());
        assert!(recognize_component("Image($r('app.media.icon'))").is_none());
        assert!(recognize_component("Image($rawfile('a.png'))").is_none());
    }

    #[test]
    fn declines_unknown_and_lowercase_calls() {
        assert!(recognize_component("MyCard('x')").is_none());
        assert!(recognize_component("text('x')").is_none());
        assert!(recognize_component("console.log('x')").is_none());
        assert!(is_component_call("MyCard('x')"));
    }

    #[test]
    fn declines_nested_parens_in_attributes() {
        assert!(recognize_component("Text('a').width(px2vp(10))").is_none());
    }

    #[test]
    fn leading_args_may_nest() {
        let stmt = recognize_component("Column({ space: getSpace(1) })").unwrap();
        assert_eq!(stmt.create_args, "{ space: getSpace(1) }");
    }

    #[test]
    fn recognition_is_deterministic() {
        let input = "Row().width('100%').height(50)";
        assert_eq!(recognize_component(input), recognize_component(input));
    }

    #[test]
    fn builder_call_gains_one_argument_and_three_statements() {
        let names = vec!["bar".to_string()];
        let call = recognize_builder_call("this.bar(1)", &names).unwrap();
        assert_eq!(call.arguments.len(), 1);
        assert_eq!(call.rewritten_arguments().len(), 2);

        let [first, second, third] = call.statements();
        assert_eq!(first, "const __builder__ = new BuilderParam();");
        assert_eq!(second, "this.bar(__builder__, 1);");
        assert_eq!(third, "__builder__.build();");
    }

    #[test]
    fn builder_call_without_args() {
        let names = vec!["header".to_string()];
        let call = recognize_builder_call("this.header();", &names).unwrap();
        assert_eq!(call.statements()[1], "this.header(__builder__);");
    }

    #[test]
    fn non_builder_methods_are_not_rewritten() {
        let names = vec!["bar".to_string()];
        assert!(recognize_builder_call("this.other(1)", &names).is_none());
        assert!(recognize_builder_call("this.bar(1).x()", &names).is_none());
        assert!(recognize_builder_call("this.bar(1)", &[]).is_none());
    }
}

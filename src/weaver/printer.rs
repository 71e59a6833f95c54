//! Renders proxy IR to source text.
//!
//! Layout is fixed: four-space indentation, braces of types and methods on
//! their own line, no blank lines between members, `) : T` return syntax.

use std::fmt::Write as _;

use super::ir::{Argument, Capture, Member, MethodNode, ProxyUnit, Stmt, TypeNode};
use crate::model::{Parameter, TypeKind, Visibility};

/// Renders a unit to text. Output always ends with a newline.
pub fn print(unit: &ProxyUnit) -> String {
    let mut printer = Printer::new();
    printer.print_unit(unit);
    printer.finish()
}

struct Printer {
    output: String,
    indent_level: usize,
    indent_str: &'static str,
}

impl Printer {
    fn new() -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            indent_str: "    ",
        }
    }

    fn finish(self) -> String {
        self.output
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn write_line(&mut self) {
        self.output.push('\n');
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.output.push_str(self.indent_str);
        }
    }

    fn increase_indent(&mut self) {
        self.indent_level += 1;
    }

    fn decrease_indent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    /// Writes `text` as indented lines. Whitespace-only lines are written
    /// exactly as given, without indentation.
    fn write_block_text(&mut self, text: &str) {
        for line in text.split('\n') {
            if !line.trim().is_empty() {
                self.write_indent();
            }
            self.write(line);
            self.write_line();
        }
    }

    fn print_unit(&mut self, unit: &ProxyUnit) {
        self.write("<?php");
        self.write_line();
        self.write_line();
        if unit.strict_types {
            self.write("declare (strict_types=1);");
            self.write_line();
        }
        if !unit.banner.is_empty() {
            self.write_block_text(&unit.banner);
        }
        if let Some(ns) = &unit.namespace {
            let _ = write!(self.output, "namespace {};", ns);
            self.write_line();
        }
        self.write_line();
        self.print_type(&unit.decl);
    }

    fn print_type(&mut self, node: &TypeNode) {
        if node.is_abstract {
            self.write("abstract ");
        }
        if node.is_final {
            self.write("final ");
        }
        let _ = write!(self.output, "{} {}", node.kind, node.name);
        if !node.extends.is_empty() {
            let _ = write!(self.output, " extends {}", node.extends.join(", "));
        }
        if !node.implements.is_empty() && node.kind == TypeKind::Class {
            let _ = write!(self.output, " implements {}", node.implements.join(", "));
        }
        self.write_line();
        self.write("{");
        self.write_line();
        self.increase_indent();
        for name in &node.uses {
            self.write_indent();
            let _ = write!(self.output, "use {};", name);
            self.write_line();
        }
        for member in &node.members {
            self.print_member(member);
        }
        self.decrease_indent();
        self.write("}");
        self.write_line();
    }

    fn print_member(&mut self, member: &Member) {
        self.write_indent();
        match member {
            Member::Constant {
                visibility,
                name,
                value,
            } => {
                if let Some(v) = visibility {
                    let _ = write!(self.output, "{} ", v);
                }
                let _ = write!(self.output, "const {} = {};", name, value);
            }
            Member::Property {
                visibility,
                is_static,
                type_hint,
                name,
                default,
            } => {
                match visibility {
                    Some(v) => {
                        let _ = write!(self.output, "{} ", v);
                    }
                    None if !is_static => self.write("var "),
                    None => {}
                }
                if *is_static {
                    self.write("static ");
                }
                if let Some(t) = type_hint {
                    let _ = write!(self.output, "{} ", t);
                }
                let _ = write!(self.output, "${}", name);
                if let Some(d) = default {
                    let _ = write!(self.output, " = {}", d);
                }
                self.write(";");
            }
            Member::Method(method) => {
                self.print_method(method);
                return;
            }
        }
        self.write_line();
    }

    fn print_method(&mut self, method: &MethodNode) {
        self.write(&modifiers(
            method.visibility,
            method.is_static,
            method.is_abstract,
            method.is_final,
        ));
        let _ = write!(
            self.output,
            "function {}({})",
            method.name,
            parameter_list(&method.parameters)
        );
        if let Some(ret) = &method.return_type {
            let _ = write!(self.output, " : {}", ret);
        }
        match &method.body {
            None => {
                self.write(";");
                self.write_line();
            }
            Some(body) => {
                self.write_line();
                self.write_indent();
                self.write("{");
                self.write_line();
                self.increase_indent();
                for stmt in body {
                    self.print_stmt(stmt);
                }
                self.decrease_indent();
                self.write_indent();
                self.write("}");
                self.write_line();
            }
        }
    }

    fn print_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Verbatim(text) => self.write_block_text(text),
            Stmt::HandleProperties => {
                self.write_indent();
                self.write("self::__handlePropertyHandler(__CLASS__);");
                self.write_line();
            }
            Stmt::ForwardToParent { arguments } => {
                self.write_indent();
                let _ = write!(
                    self.output,
                    "parent::__construct({});",
                    argument_list(arguments)
                );
                self.write_line();
            }
            Stmt::GuardedForwardToParent => {
                self.write_indent();
                self.write("if (method_exists(parent::class, '__construct')) {");
                self.write_line();
                self.increase_indent();
                self.write_indent();
                self.write("parent::__construct(...func_get_args());");
                self.write_line();
                self.decrease_indent();
                self.write_indent();
                self.write("}");
                self.write_line();
            }
            Stmt::Capture { variable, value } => {
                self.write_indent();
                let _ = write!(self.output, "${} = {};", variable, value.as_str());
                self.write_line();
            }
            Stmt::ProxyCall {
                scope,
                returns,
                captures,
                body,
            } => {
                self.write_indent();
                if *returns {
                    self.write("return ");
                }
                let _ = write!(
                    self.output,
                    "self::__proxyCall({}, __FUNCTION__, self::__getParamsMap(__CLASS__, __FUNCTION__, func_get_args()), function () use({}) {{",
                    scope.as_str(),
                    capture_list(captures)
                );
                self.write_line();
                self.increase_indent();
                for inner in body {
                    self.print_stmt(inner);
                }
                self.decrease_indent();
                self.write_indent();
                self.write("});");
                self.write_line();
            }
        }
    }
}

/// Modifier prefix in the order public, protected, private, static, abstract, final.
fn modifiers(
    visibility: Option<Visibility>,
    is_static: bool,
    is_abstract: bool,
    is_final: bool,
) -> String {
    let mut out = String::new();
    if let Some(v) = visibility {
        let _ = write!(out, "{} ", v);
    }
    if is_static {
        out.push_str("static ");
    }
    if is_abstract {
        out.push_str("abstract ");
    }
    if is_final {
        out.push_str("final ");
    }
    out
}

fn parameter_list(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(|p| {
            let mut out = String::new();
            if let Some(t) = &p.type_hint {
                let _ = write!(out, "{} ", t);
            }
            if p.by_ref {
                out.push('&');
            }
            if p.variadic {
                out.push_str("...");
            }
            let _ = write!(out, "${}", p.name);
            if let Some(d) = &p.default {
                let _ = write!(out, " = {}", d);
            }
            out
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn argument_list(arguments: &[Argument]) -> String {
    arguments
        .iter()
        .map(|a| {
            if a.spread {
                format!("...${}", a.name)
            } else {
                format!("${}", a.name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn capture_list(captures: &[Capture]) -> String {
    captures
        .iter()
        .map(|c| {
            if c.by_ref {
                format!("&${}", c.name)
            } else {
                format!("${}", c.name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weaver::ir::MagicConstant;

    fn method(body: Option<Vec<Stmt>>) -> MethodNode {
        MethodNode {
            visibility: Some(Visibility::Public),
            is_static: false,
            is_abstract: false,
            is_final: false,
            name: "run".to_string(),
            parameters: vec![
                Parameter::typed("id", "int"),
                Parameter::typed("tags", "string").variadic(),
            ],
            return_type: Some("bool".to_string()),
            body,
        }
    }

    fn unit(members: Vec<Member>) -> ProxyUnit {
        ProxyUnit {
            strict_types: true,
            banner: String::new(),
            namespace: Some("App".to_string()),
            decl: TypeNode {
                kind: TypeKind::Class,
                name: "Foo".to_string(),
                is_abstract: false,
                is_final: false,
                extends: vec![],
                implements: vec![],
                uses: vec![],
                members,
            },
        }
    }

    #[test]
    fn modifiers_follow_fixed_order() {
        assert_eq!(
            modifiers(Some(Visibility::Protected), true, false, true),
            "protected static final "
        );
        assert_eq!(modifiers(None, false, false, false), "");
    }

    #[test]
    fn parameter_list_renders_all_forms() {
        let params = vec![
            Parameter::typed("a", "?int").with_default("null"),
            Parameter::new("b").by_ref(),
            Parameter::new("rest").variadic(),
        ];
        assert_eq!(parameter_list(&params), "?int $a = null, &$b, ...$rest");
    }

    #[test]
    fn signature_without_body_ends_with_semicolon() {
        let out = print(&unit(vec![Member::Method(method(None))]));
        assert!(out.contains("    public function run(int $id, string ...$tags) : bool;\n"));
    }

    #[test]
    fn verbatim_statements_keep_relative_indentation() {
        let body = vec![Stmt::Verbatim("if ($id) {\n    return true;\n}".to_string())];
        let out = print(&unit(vec![Member::Method(method(Some(body)))]));
        assert!(out.contains("        if ($id) {\n            return true;\n        }\n    }\n"));
    }

    #[test]
    fn whitespace_only_lines_inside_verbatim_text_are_kept() {
        let text = "$s = <<<EOT\r\n  \r\n\t\nEOT;";
        let body = vec![Stmt::Verbatim(text.to_string())];
        let out = print(&unit(vec![Member::Method(method(Some(body)))]));
        assert!(out.contains("        $s = <<<EOT\r\n  \r\n\t\n        EOT;\n"));
    }

    #[test]
    fn proxy_call_renders_closure_with_captures() {
        let body = vec![Stmt::ProxyCall {
            scope: MagicConstant::Class,
            returns: false,
            captures: vec![
                Capture {
                    name: "__function__".to_string(),
                    by_ref: false,
                },
                Capture {
                    name: "out".to_string(),
                    by_ref: true,
                },
            ],
            body: vec![Stmt::Verbatim("$out = 1;".to_string())],
        }];
        let out = print(&unit(vec![Member::Method(method(Some(body)))]));
        assert!(out.contains("function () use($__function__, &$out) {\n            $out = 1;\n        });\n"));
        assert!(out.contains("        self::__proxyCall(__CLASS__, __FUNCTION__,"));
    }

    #[test]
    fn properties_and_constants_print_verbatim() {
        let out = print(&unit(vec![
            Member::Constant {
                visibility: Some(Visibility::Public),
                name: "LIMIT".to_string(),
                value: "10".to_string(),
            },
            Member::Property {
                visibility: None,
                is_static: false,
                type_hint: None,
                name: "legacy".to_string(),
                default: None,
            },
            Member::Property {
                visibility: Some(Visibility::Protected),
                is_static: true,
                type_hint: Some("array".to_string()),
                name: "items".to_string(),
                default: Some("[]".to_string()),
            },
        ]));
        assert!(out.contains("    public const LIMIT = 10;\n"));
        assert!(out.contains("    var $legacy;\n"));
        assert!(out.contains("    protected static array $items = [];\n"));
    }

    #[test]
    fn header_omits_namespace_for_global_types() {
        let mut u = unit(vec![]);
        u.namespace = None;
        u.strict_types = false;
        assert_eq!(print(&u), "<?php\n\n\nclass Foo\n{\n}\n");
    }
}

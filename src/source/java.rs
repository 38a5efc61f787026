//! Java syntax extraction using tree-sitter.
//!
//! Produces an owned [`FileSyntax`] per file: package, imports and the type
//! declarations with their members and the parts of method bodies the
//! passes care about (invocations, returns, locals, anonymous classes).
//! Types are still unresolved text here; [`super::index`] resolves them.

use std::path::{Path, PathBuf};

use anyhow::Context;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use super::events::{Import, TypeKind};

/// Tree-sitter query for the package declaration.
const PACKAGE_QUERY: &str = r#"
(package_declaration
  [(scoped_identifier) (identifier)] @package_name
)
"#;

/// Tree-sitter query for imports; details are read from the node's children.
const IMPORT_QUERY: &str = r#"
(import_declaration) @import
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub is_public: bool,
    pub is_private: bool,
    pub is_abstract: bool,
    pub is_static: bool,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileSyntax {
    pub path: PathBuf,
    pub package: Option<String>,
    pub imports: Vec<Import>,
    pub types: Vec<TypeSyntax>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSyntax {
    /// Empty for anonymous classes.
    pub name: String,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    pub is_anonymous: bool,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(FieldSyntax),
    Method(MethodSyntax),
    Type(TypeSyntax),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSyntax {
    pub type_text: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub type_text: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodSyntax {
    pub name: String,
    pub is_constructor: bool,
    pub modifiers: Modifiers,
    pub has_body: bool,
    pub return_type: Option<String>,
    pub params: Vec<Variable>,
    pub locals: Vec<Variable>,
    /// Body contents in source order.
    pub body: Vec<BodyItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BodyItem {
    Invocation(CallSyntax),
    Return(Option<Expr>),
    Anonymous(TypeSyntax),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallSyntax {
    pub receiver: Receiver,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Receiver {
    Implicit,
    This,
    Super,
    Expr(Box<Expr>),
}

/// The expression shapes whose static type can be derived.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    New { type_text: String, anonymous: bool },
    NewArray(String),
    This,
    Name(String),
    Field { object: Box<Expr>, field: String },
    Cast(String),
    /// Literal with the qualified name of its type.
    Literal(&'static str),
    Call(Box<CallSyntax>),
    Other,
}

pub struct JavaParser {
    language: Language,
    package_query: Query,
    import_query: Query,
}

impl JavaParser {
    pub fn new() -> anyhow::Result<Self> {
        let language: Language = tree_sitter_java::LANGUAGE.into();
        let package_query = Query::new(&language, PACKAGE_QUERY)?;
        let import_query = Query::new(&language, IMPORT_QUERY)?;
        Ok(Self {
            language,
            package_query,
            import_query,
        })
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    pub fn parse(&self, path: &Path, source: &str) -> anyhow::Result<FileSyntax> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .with_context(|| format!("tree-sitter failed to parse {}", path.display()))?;
        let root = tree.root_node();
        let extractor = Extractor {
            src: source.as_bytes(),
        };

        let package = self.package(&extractor, root);
        let imports = self.imports(&extractor, root);

        let mut types = Vec::new();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            if let Some(t) = extractor.type_decl(child) {
                types.push(t);
            }
        }

        Ok(FileSyntax {
            path: path.to_path_buf(),
            package,
            imports,
            types,
        })
    }

    fn package(&self, ex: &Extractor<'_>, root: Node<'_>) -> Option<String> {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.package_query, root, ex.src);
        while let Some(m) = matches.next() {
            if let Some(capture) = m.captures.first() {
                return Some(ex.compact(capture.node));
            }
        }
        None
    }

    fn imports(&self, ex: &Extractor<'_>, root: Node<'_>) -> Vec<Import> {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.import_query, root, ex.src);
        let mut imports = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let node = capture.node;
                let mut import = Import {
                    path: String::new(),
                    on_demand: false,
                    is_static: false,
                };
                let mut walk = node.walk();
                for child in node.children(&mut walk) {
                    match child.kind() {
                        "static" => import.is_static = true,
                        "asterisk" => import.on_demand = true,
                        "scoped_identifier" | "identifier" => import.path = ex.compact(child),
                        _ => {}
                    }
                }
                if !import.path.is_empty() {
                    imports.push(import);
                }
            }
        }
        imports
    }
}

struct Extractor<'a> {
    src: &'a [u8],
}

impl<'a> Extractor<'a> {
    fn text(&self, node: Node<'_>) -> &'a str {
        node.utf8_text(self.src).unwrap_or("")
    }

    /// Node text with all whitespace removed, for names and types.
    fn compact(&self, node: Node<'_>) -> String {
        self.text(node).chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn field_text(&self, node: Node<'_>, field: &str) -> Option<String> {
        node.child_by_field_name(field).map(|n| self.compact(n))
    }

    fn modifiers(&self, node: Node<'_>) -> Modifiers {
        let mut mods = Modifiers::default();
        let mut walk = node.walk();
        for child in node.children(&mut walk) {
            if child.kind() != "modifiers" {
                continue;
            }
            let mut inner = child.walk();
            for token in child.children(&mut inner) {
                match token.kind() {
                    "public" => mods.is_public = true,
                    "private" => mods.is_private = true,
                    "abstract" => mods.is_abstract = true,
                    "static" => mods.is_static = true,
                    "default" => mods.is_default = true,
                    _ => {}
                }
            }
        }
        mods
    }

    /// Named type children of a `type_list` under `node`'s child of kind `wrapper`.
    fn type_list(&self, node: Node<'_>, wrapper: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut walk = node.walk();
        for child in node.children(&mut walk) {
            if child.kind() != wrapper {
                continue;
            }
            let mut inner = child.walk();
            for list in child.named_children(&mut inner) {
                if list.kind() == "type_list" {
                    let mut types = list.walk();
                    for t in list.named_children(&mut types) {
                        out.push(self.compact(t));
                    }
                }
            }
        }
        out
    }

    fn type_decl(&self, node: Node<'_>) -> Option<TypeSyntax> {
        let kind = match node.kind() {
            "class_declaration" => TypeKind::Class,
            "interface_declaration" => TypeKind::Interface,
            "enum_declaration" => TypeKind::Enum,
            _ => return None,
        };
        let name = self.field_text(node, "name")?;
        let superclass = node.child_by_field_name("superclass").and_then(|s| {
            let mut walk = s.walk();
            let found = s.named_children(&mut walk).next().map(|t| self.compact(t));
            found
        });
        let interfaces = match kind {
            TypeKind::Interface => self.type_list(node, "extends_interfaces"),
            _ => self.type_list(node, "super_interfaces"),
        };
        let members = match (kind, node.child_by_field_name("body")) {
            (TypeKind::Enum, _) | (_, None) => Vec::new(),
            (_, Some(body)) => self.members(body),
        };
        Some(TypeSyntax {
            name,
            kind,
            modifiers: self.modifiers(node),
            is_anonymous: false,
            superclass,
            interfaces,
            members,
        })
    }

    fn members(&self, body: Node<'_>) -> Vec<Member> {
        let mut members = Vec::new();
        let mut walk = body.walk();
        for child in body.named_children(&mut walk) {
            match child.kind() {
                "field_declaration" | "constant_declaration" => {
                    if let Some(field) = self.field(child) {
                        members.push(Member::Field(field));
                    }
                }
                "method_declaration" | "constructor_declaration" => {
                    if let Some(method) = self.method(child) {
                        members.push(Member::Method(method));
                    }
                }
                _ => {
                    if let Some(t) = self.type_decl(child) {
                        members.push(Member::Type(t));
                    }
                }
            }
        }
        members
    }

    fn field(&self, node: Node<'_>) -> Option<FieldSyntax> {
        let type_text = self.field_text(node, "type")?;
        let mut names = Vec::new();
        let mut walk = node.walk();
        for declarator in node.children_by_field_name("declarator", &mut walk) {
            if let Some(name) = self.field_text(declarator, "name") {
                names.push(name);
            }
        }
        Some(FieldSyntax { type_text, names })
    }

    fn method(&self, node: Node<'_>) -> Option<MethodSyntax> {
        let is_constructor = node.kind() == "constructor_declaration";
        let name = self.field_text(node, "name")?;
        let modifiers = self.modifiers(node);
        let body = node.child_by_field_name("body");
        let return_type = if is_constructor {
            None
        } else {
            self.field_text(node, "type")
        };

        let mut method = MethodSyntax {
            name,
            is_constructor,
            modifiers,
            has_body: body.is_some(),
            return_type,
            params: Vec::new(),
            locals: Vec::new(),
            body: Vec::new(),
        };
        if let Some(params) = node.child_by_field_name("parameters") {
            self.params(params, &mut method.params);
        }
        if let Some(body) = body {
            self.walk_body(body, &mut method);
        }
        Some(method)
    }

    fn params(&self, params: Node<'_>, out: &mut Vec<Variable>) {
        let mut walk = params.walk();
        for param in params.named_children(&mut walk) {
            match param.kind() {
                "formal_parameter" => {
                    if let (Some(type_text), Some(name)) = (
                        self.field_text(param, "type"),
                        self.field_text(param, "name"),
                    ) {
                        let dims = self.field_text(param, "dimensions").unwrap_or_default();
                        out.push(Variable {
                            type_text: format!("{}{}", type_text, dims),
                            name,
                        });
                    }
                }
                "spread_parameter" => {
                    let mut inner = param.walk();
                    let mut type_text = None;
                    let mut name = None;
                    for child in param.named_children(&mut inner) {
                        match child.kind() {
                            "variable_declarator" => name = self.field_text(child, "name"),
                            "modifiers" => {}
                            _ if type_text.is_none() => type_text = Some(self.compact(child)),
                            _ => {}
                        }
                    }
                    if let (Some(t), Some(n)) = (type_text, name) {
                        out.push(Variable {
                            type_text: format!("{}[]", t),
                            name: n,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    fn walk_body(&self, node: Node<'_>, method: &mut MethodSyntax) {
        match node.kind() {
            // Local type declarations are not analyzed.
            "class_declaration" | "interface_declaration" | "enum_declaration"
            | "record_declaration" => return,
            "method_invocation" => {
                method.body.push(BodyItem::Invocation(self.call(node)));
            }
            "return_statement" => {
                let mut walk = node.walk();
                let expr = node.named_children(&mut walk).next().map(|e| self.expr(e));
                method.body.push(BodyItem::Return(expr));
            }
            "object_creation_expression" => {
                if let Some(class_body) = anonymous_body(node) {
                    if let Some(args) = node.child_by_field_name("arguments") {
                        self.walk_body(args, method);
                    }
                    method.body.push(BodyItem::Anonymous(TypeSyntax {
                        name: String::new(),
                        kind: TypeKind::Class,
                        modifiers: Modifiers::default(),
                        is_anonymous: true,
                        superclass: None,
                        interfaces: Vec::new(),
                        members: self.members(class_body),
                    }));
                    return;
                }
            }
            "local_variable_declaration" => {
                if let Some(type_text) = self.field_text(node, "type") {
                    let mut walk = node.walk();
                    for declarator in node.children_by_field_name("declarator", &mut walk) {
                        if let Some(name) = self.field_text(declarator, "name") {
                            method.locals.push(Variable {
                                type_text: type_text.clone(),
                                name,
                            });
                        }
                    }
                }
            }
            "enhanced_for_statement" | "resource" => {
                if let (Some(type_text), Some(name)) =
                    (self.field_text(node, "type"), self.field_text(node, "name"))
                {
                    method.locals.push(Variable { type_text, name });
                }
            }
            _ => {}
        }
        let mut walk = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut walk).collect();
        for child in children {
            self.walk_body(child, method);
        }
    }

    fn call(&self, node: Node<'_>) -> CallSyntax {
        let name = self.field_text(node, "name").unwrap_or_default();
        let receiver = match node.child_by_field_name("object") {
            None => Receiver::Implicit,
            Some(obj) => match obj.kind() {
                "this" => Receiver::This,
                "super" => Receiver::Super,
                _ => Receiver::Expr(Box::new(self.expr(obj))),
            },
        };
        CallSyntax { receiver, name }
    }

    fn expr(&self, node: Node<'_>) -> Expr {
        match node.kind() {
            "null_literal" => Expr::Null,
            "this" => Expr::This,
            "identifier" => Expr::Name(self.compact(node)),
            "string_literal" | "text_block" => Expr::Literal("java.lang.String"),
            "character_literal" => Expr::Literal("char"),
            "true" | "false" => Expr::Literal("boolean"),
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal" => {
                if self.text(node).ends_with(|c| c == 'l' || c == 'L') {
                    Expr::Literal("long")
                } else {
                    Expr::Literal("int")
                }
            }
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                if self.text(node).ends_with(|c| c == 'f' || c == 'F') {
                    Expr::Literal("float")
                } else {
                    Expr::Literal("double")
                }
            }
            "parenthesized_expression" => {
                let mut walk = node.walk();
                let inner = node.named_children(&mut walk).next();
                inner.map(|e| self.expr(e)).unwrap_or(Expr::Other)
            }
            "cast_expression" => self
                .field_text(node, "type")
                .map(Expr::Cast)
                .unwrap_or(Expr::Other),
            "object_creation_expression" => match self.field_text(node, "type") {
                Some(type_text) => Expr::New {
                    type_text,
                    anonymous: anonymous_body(node).is_some(),
                },
                None => Expr::Other,
            },
            "array_creation_expression" => match self.field_text(node, "type") {
                Some(t) => {
                    let mut walk = node.walk();
                    let dims = node
                        .named_children(&mut walk)
                        .filter(|c| c.kind() == "dimensions_expr" || c.kind() == "dimensions")
                        .map(|c| "[]".repeat(self.text(c).matches('[').count()))
                        .collect::<String>();
                    Expr::NewArray(format!("{}{}", t, dims))
                }
                None => Expr::Other,
            },
            "field_access" => match (
                node.child_by_field_name("object"),
                self.field_text(node, "field"),
            ) {
                (Some(obj), Some(field)) => Expr::Field {
                    object: Box::new(self.expr(obj)),
                    field,
                },
                _ => Expr::Other,
            },
            "method_invocation" => Expr::Call(Box::new(self.call(node))),
            _ => Expr::Other,
        }
    }
}

fn anonymous_body<'t>(node: Node<'t>) -> Option<Node<'t>> {
    let mut walk = node.walk();
    let body = node
        .named_children(&mut walk)
        .find(|c| c.kind() == "class_body");
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> FileSyntax {
        JavaParser::new()
            .unwrap()
            .parse(Path::new("Test.java"), src)
            .unwrap()
    }

    #[test]
    fn test_package_and_imports() {
        let file = parse(
            r#"
package com.example.shapes;

import java.util.List;
import com.example.util.*;
import static java.lang.Math.max;

public class Circle {}
"#,
        );
        assert_eq!(file.package.as_deref(), Some("com.example.shapes"));
        assert_eq!(file.imports.len(), 3);
        assert_eq!(file.imports[0].path, "java.util.List");
        assert!(!file.imports[0].on_demand);
        assert_eq!(file.imports[1].path, "com.example.util");
        assert!(file.imports[1].on_demand);
        assert!(file.imports[2].is_static);
    }

    #[test]
    fn test_class_header() {
        let file = parse(
            r#"
public abstract class Shape<T> extends Base<T> implements Drawable, Comparable<Shape<T>> {}
interface Solid extends Drawable, Sized {}
"#,
        );
        let shape = &file.types[0];
        assert_eq!(shape.name, "Shape");
        assert!(shape.modifiers.is_public && shape.modifiers.is_abstract);
        assert_eq!(shape.superclass.as_deref(), Some("Base<T>"));
        assert_eq!(shape.interfaces, vec!["Drawable", "Comparable<Shape<T>>"]);

        let solid = &file.types[1];
        assert_eq!(solid.kind, TypeKind::Interface);
        assert_eq!(solid.interfaces, vec!["Drawable", "Sized"]);
        assert!(solid.superclass.is_none());
    }

    #[test]
    fn test_members_and_body() {
        let file = parse(
            r#"
class Canvas {
    private Shape shape, other;

    Canvas(int size) {}

    public Shape make(String kind) {
        Shape local = build(kind);
        helper.run(new Runnable() { public void run() { inner(); } });
        return new Circle();
    }

    class Inner {}
}
"#,
        );
        let canvas = &file.types[0];
        assert_eq!(canvas.members.len(), 4);
        match &canvas.members[0] {
            Member::Field(f) => {
                assert_eq!(f.type_text, "Shape");
                assert_eq!(f.names, vec!["shape", "other"]);
            }
            other => panic!("expected field, got {:?}", other),
        }
        match &canvas.members[1] {
            Member::Method(m) => {
                assert!(m.is_constructor);
                assert_eq!(m.params[0].type_text, "int");
            }
            other => panic!("expected constructor, got {:?}", other),
        }
        match &canvas.members[2] {
            Member::Method(m) => {
                assert_eq!(m.name, "make");
                assert_eq!(m.return_type.as_deref(), Some("Shape"));
                assert_eq!(m.locals[0].name, "local");
                let kinds: Vec<_> = m
                    .body
                    .iter()
                    .map(|b| match b {
                        BodyItem::Invocation(c) => format!("call:{}", c.name),
                        BodyItem::Return(_) => "return".to_string(),
                        BodyItem::Anonymous(_) => "anonymous".to_string(),
                    })
                    .collect();
                assert_eq!(kinds, vec!["call:build", "call:run", "anonymous", "return"]);
                match m.body.last() {
                    Some(BodyItem::Return(Some(Expr::New { type_text, anonymous }))) => {
                        assert_eq!(type_text, "Circle");
                        assert!(!anonymous);
                    }
                    other => panic!("unexpected return {:?}", other),
                }
            }
            other => panic!("expected method, got {:?}", other),
        }
        assert!(matches!(canvas.members[3], Member::Type(_)));
    }

    #[test]
    fn test_enum_members_not_collected() {
        let file = parse("enum Color { RED, GREEN; void paint() {} }");
        assert_eq!(file.types[0].kind, TypeKind::Enum);
        assert!(file.types[0].members.is_empty());
    }
}

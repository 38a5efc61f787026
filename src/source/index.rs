//! Project-wide type index and binding resolution.
//!
//! Resolves written type names the way a Java compiler scope would: the
//! enclosing type chain and its member types, the current package, single
//! type imports, on-demand imports, then implicit `java.lang`. Names that
//! resolve nowhere come back as recovered bindings carrying the written name.

use std::collections::{HashMap, HashSet};

use phf::phf_set;

use super::events::{erasure, Import, Invocation, TypeKind, TypeRef};
use super::java::{CallSyntax, Expr, FileSyntax, Member, Modifiers, Receiver, TypeSyntax, Variable};

static PRIMITIVES: phf::Set<&'static str> = phf_set! {
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
};

/// Types visible without import through `java.lang`.
static JAVA_LANG: phf::Set<&'static str> = phf_set! {
    "Object", "String", "StringBuilder", "StringBuffer", "CharSequence",
    "Integer", "Long", "Short", "Byte", "Character", "Boolean", "Float", "Double",
    "Number", "Math", "System", "Thread", "Runnable", "Iterable", "Comparable",
    "Cloneable", "AutoCloseable", "Class", "Enum", "Void", "Record",
    "Throwable", "Exception", "RuntimeException", "Error",
    "IllegalArgumentException", "IllegalStateException", "NullPointerException",
    "UnsupportedOperationException", "IndexOutOfBoundsException",
    "Override", "Deprecated", "FunctionalInterface", "SuppressWarnings",
};

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: String,
    /// Abstract per the binding: written `abstract`, or a body-less
    /// interface method.
    pub is_abstract: bool,
    pub return_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub qualified: String,
    pub simple: String,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    /// Qualified name of the enclosing type for member types.
    pub outer: Option<String>,
    pub file: usize,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<Variable>,
    pub methods: Vec<MethodInfo>,
    pub member_types: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct FileScope {
    package: Option<String>,
    imports: Vec<Import>,
}

/// Where a name is being resolved: a file and the chain of enclosing types,
/// outermost first.
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    pub file: usize,
    pub chain: &'a [String],
}

/// Method-body context for typing expressions.
pub struct BodyScope<'a> {
    pub scope: Scope<'a>,
    pub params: &'a [Variable],
    pub locals: &'a [Variable],
}

impl BodyScope<'_> {
    fn current(&self) -> Option<&str> {
        self.scope.chain.last().map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct ProjectIndex {
    files: Vec<FileScope>,
    types: HashMap<String, TypeInfo>,
}

impl ProjectIndex {
    /// Index every type declared in `files`. File positions are the scope ids
    /// used by later lookups.
    pub fn build(files: &[FileSyntax]) -> Self {
        let mut index = ProjectIndex::default();
        for (i, file) in files.iter().enumerate() {
            index.files.push(FileScope {
                package: file.package.clone(),
                imports: file.imports.clone(),
            });
            for t in &file.types {
                let qualified = qualify(file.package.as_deref(), &t.name);
                index.add_type(i, t, qualified, None);
            }
        }
        index
    }

    fn add_type(&mut self, file: usize, t: &TypeSyntax, qualified: String, outer: Option<String>) {
        let mut info = TypeInfo {
            qualified: qualified.clone(),
            simple: t.name.clone(),
            kind: t.kind,
            modifiers: t.modifiers,
            outer,
            file,
            superclass: t.superclass.clone(),
            interfaces: t.interfaces.clone(),
            fields: Vec::new(),
            methods: Vec::new(),
            member_types: Vec::new(),
        };
        for member in &t.members {
            match member {
                Member::Field(f) => info.fields.extend(f.names.iter().map(|n| Variable {
                    type_text: f.type_text.clone(),
                    name: n.clone(),
                })),
                Member::Method(m) if !m.is_constructor => {
                    let implicit_abstract = t.kind == TypeKind::Interface
                        && !m.has_body
                        && !m.modifiers.is_static
                        && !m.modifiers.is_default;
                    info.methods.push(MethodInfo {
                        name: m.name.clone(),
                        is_abstract: m.modifiers.is_abstract || implicit_abstract,
                        return_type: m.return_type.clone(),
                    });
                }
                Member::Method(_) => {}
                Member::Type(nested) => {
                    info.member_types.push(nested.name.clone());
                    let nested_q = format!("{}.{}", qualified, nested.name);
                    self.add_type(file, nested, nested_q, Some(qualified.clone()));
                }
            }
        }
        self.types.insert(qualified, info);
    }

    pub fn get(&self, qualified: &str) -> Option<&TypeInfo> {
        self.types.get(qualified)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Enclosing chain of a declared type, itself included, outermost first.
    pub fn chain_of(&self, qualified: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = self.types.get(qualified);
        while let Some(info) = current {
            chain.push(info.qualified.clone());
            current = info.outer.as_deref().and_then(|o| self.types.get(o));
        }
        chain.reverse();
        chain
    }

    /// Binding for a declared project type.
    pub fn type_ref(&self, qualified: &str) -> TypeRef {
        match self.types.get(qualified) {
            Some(info) => TypeRef {
                qualified: info.qualified.clone(),
                simple: info.simple.clone(),
                is_interface: info.kind == TypeKind::Interface,
                is_enum: info.kind == TypeKind::Enum,
                is_nested: info.outer.is_some(),
            },
            None => TypeRef::named(qualified, simple_of(qualified)),
        }
    }

    /// Resolve a written type in `scope`. `None` only for empty input.
    pub fn resolve_type(&self, text: &str, scope: &Scope<'_>) -> Option<TypeRef> {
        let (base, args, dims) = split_type(text);
        if base.is_empty() {
            return None;
        }
        if PRIMITIVES.contains(base) {
            let name = format!("{}{}", base, dims);
            return Some(TypeRef::named(name.clone(), name));
        }
        let qualified_base = self
            .resolve_base(base, scope)
            .unwrap_or_else(|| base.to_string());
        let mut binding = self.type_ref(&qualified_base);
        binding.qualified = format!("{}{}{}", qualified_base, args, dims);
        if !dims.is_empty() {
            binding.simple = format!("{}{}", binding.simple, dims);
            binding.is_interface = false;
            binding.is_enum = false;
        }
        Some(binding)
    }

    fn resolve_base(&self, base: &str, scope: &Scope<'_>) -> Option<String> {
        let mut segments = base.split('.');
        let first = segments.next()?;
        let rest: Vec<&str> = segments.collect();
        match self.resolve_simple(first, scope) {
            Some(q) if rest.is_empty() => Some(q),
            Some(q) => Some(format!("{}.{}", q, rest.join("."))),
            None if !rest.is_empty() => Some(base.to_string()),
            None => None,
        }
    }

    fn resolve_simple(&self, name: &str, scope: &Scope<'_>) -> Option<String> {
        for enclosing in scope.chain.iter().rev() {
            if let Some(info) = self.types.get(enclosing) {
                if info.simple == name {
                    return Some(info.qualified.clone());
                }
                if info.member_types.iter().any(|m| m == name) {
                    return Some(format!("{}.{}", info.qualified, name));
                }
            }
        }

        let file = self.files.get(scope.file)?;
        let same_package = qualify(file.package.as_deref(), name);
        if self.types.contains_key(&same_package) {
            return Some(same_package);
        }

        let suffix = format!(".{}", name);
        if let Some(import) = file
            .imports
            .iter()
            .find(|i| !i.is_static && !i.on_demand && i.path.ends_with(&suffix))
        {
            return Some(import.path.clone());
        }

        for import in file.imports.iter().filter(|i| !i.is_static && i.on_demand) {
            let candidate = format!("{}.{}", import.path, name);
            if self.types.contains_key(&candidate) {
                return Some(candidate);
            }
        }

        if JAVA_LANG.contains(name) {
            return Some(format!("java.lang.{}", name));
        }
        None
    }

    /// Resolve the supertypes of a declared type in its own scope.
    pub fn supertypes(&self, qualified: &str) -> (Option<TypeRef>, Vec<TypeRef>) {
        let Some(info) = self.types.get(qualified) else {
            return (None, Vec::new());
        };
        let chain = self.chain_of(qualified);
        let scope = Scope {
            file: info.file,
            chain: &chain,
        };
        let superclass = info
            .superclass
            .as_deref()
            .and_then(|s| self.resolve_type(s, &scope));
        let interfaces = info
            .interfaces
            .iter()
            .filter_map(|i| self.resolve_type(i, &scope))
            .collect();
        (superclass, interfaces)
    }

    /// Find `method` on `qualified` or its project supertypes. Returns the
    /// declaring type and the method.
    pub fn find_method(&self, qualified: &str, method: &str) -> Option<(&TypeInfo, &MethodInfo)> {
        let mut visited = HashSet::new();
        let mut queue = vec![qualified.to_string()];
        while !queue.is_empty() {
            let current = queue.remove(0);
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(info) = self.types.get(&current) else {
                continue;
            };
            if let Some(m) = info.methods.iter().find(|m| m.name == method) {
                return Some((info, m));
            }
            let (superclass, interfaces) = self.supertypes(&current);
            queue.extend(superclass.map(|s| s.erasure().to_string()));
            queue.extend(interfaces.iter().map(|i| i.erasure().to_string()));
        }
        None
    }

    /// Type of field `name` on `qualified` or its project supertypes.
    fn find_field(&self, qualified: &str, name: &str) -> Option<TypeRef> {
        let mut visited = HashSet::new();
        let mut queue = vec![qualified.to_string()];
        while !queue.is_empty() {
            let current = queue.remove(0);
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(info) = self.types.get(&current) else {
                continue;
            };
            if let Some(field) = info.fields.iter().find(|f| f.name == name) {
                let chain = self.chain_of(&current);
                let scope = Scope {
                    file: info.file,
                    chain: &chain,
                };
                return self.resolve_type(&field.type_text, &scope);
            }
            let (superclass, interfaces) = self.supertypes(&current);
            queue.extend(superclass.map(|s| s.erasure().to_string()));
            queue.extend(interfaces.iter().map(|i| i.erasure().to_string()));
        }
        None
    }

    fn variable(&self, name: &str, body: &BodyScope<'_>) -> Option<TypeRef> {
        let local = body
            .locals
            .iter()
            .rev()
            .chain(body.params.iter().rev())
            .find(|v| v.name == name);
        if let Some(v) = local {
            return self.resolve_type(&v.type_text, &body.scope);
        }
        body.scope
            .chain
            .iter()
            .rev()
            .find_map(|t| self.find_field(t, name))
    }

    /// Resolve an invocation in a method body. `None` when the method binding
    /// cannot be established.
    pub fn resolve_invocation(&self, call: &CallSyntax, body: &BodyScope<'_>) -> Option<Invocation> {
        let on_project = |owner: &str| {
            self.find_method(owner, &call.name).map(|(info, m)| Invocation {
                method: call.name.clone(),
                declaring: self.type_ref(&info.qualified),
                is_abstract: m.is_abstract,
            })
        };
        match &call.receiver {
            Receiver::Implicit => body.scope.chain.iter().rev().find_map(|t| on_project(t.as_str())),
            Receiver::This => on_project(body.current()?),
            Receiver::Super => {
                let (superclass, _) = self.supertypes(body.current()?);
                let superclass = superclass?;
                on_project(superclass.erasure()).or_else(|| self.external(call, superclass))
            }
            Receiver::Expr(expr) => {
                let receiver = match expr.as_ref() {
                    Expr::Name(n) => self
                        .variable(n, body)
                        .or_else(|| self.static_receiver(n, &body.scope)),
                    other => self.expr_type(other, body),
                }?;
                if receiver.is_null() || PRIMITIVES.contains(receiver.erasure()) {
                    return None;
                }
                on_project(receiver.erasure()).or_else(|| self.external(call, receiver))
            }
        }
    }

    /// Invocation on a type outside the project: the receiver type is taken
    /// as the declaring type.
    fn external(&self, call: &CallSyntax, receiver: TypeRef) -> Option<Invocation> {
        if self.types.contains_key(receiver.erasure()) {
            return None;
        }
        let qualified = receiver.erasure().to_string();
        Some(Invocation {
            method: call.name.clone(),
            declaring: TypeRef {
                qualified,
                ..receiver
            },
            is_abstract: false,
        })
    }

    /// `Name.method()` where `Name` only resolves as a type.
    fn static_receiver(&self, name: &str, scope: &Scope<'_>) -> Option<TypeRef> {
        if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
            return None;
        }
        self.resolve_base(name, scope).map(|q| self.type_ref(&q))
    }

    /// Static type of an expression.
    pub fn expr_type(&self, expr: &Expr, body: &BodyScope<'_>) -> Option<TypeRef> {
        match expr {
            Expr::Null => Some(TypeRef::null()),
            Expr::New {
                anonymous: true, ..
            } => Some(TypeRef {
                qualified: String::new(),
                simple: String::new(),
                is_interface: false,
                is_enum: false,
                is_nested: true,
            }),
            Expr::New { type_text, .. } | Expr::Cast(type_text) | Expr::NewArray(type_text) => {
                self.resolve_type(type_text, &body.scope)
            }
            Expr::This => body.current().map(|t| self.type_ref(t)),
            Expr::Name(name) => self.variable(name, body),
            Expr::Field { object, field } => {
                let owner = match object.as_ref() {
                    Expr::This => body.current()?.to_string(),
                    other => self.expr_type(other, body)?.erasure().to_string(),
                };
                self.find_field(&owner, field)
            }
            Expr::Literal(q) => Some(TypeRef::named(*q, simple_of(q))),
            Expr::Call(call) => {
                let invocation = self.resolve_invocation(call, body)?;
                let (owner, method) =
                    self.find_method(invocation.declaring.erasure(), &invocation.method)?;
                let chain = self.chain_of(&owner.qualified);
                let scope = Scope {
                    file: owner.file,
                    chain: &chain,
                };
                self.resolve_type(method.return_type.as_deref()?, &scope)
            }
            Expr::Other => None,
        }
    }
}

fn qualify(package: Option<&str>, name: &str) -> String {
    match package {
        Some(p) if !p.is_empty() => format!("{}.{}", p, name),
        _ => name.to_string(),
    }
}

fn simple_of(qualified: &str) -> &str {
    let base = erasure(qualified);
    base.rsplit('.').next().unwrap_or(base)
}

/// Split a written type into base name, generic arguments and array suffix.
///
/// `Map<K,V>[]` gives `("Map", "<K,V>", "[]")`. Varargs count as one array
/// dimension.
fn split_type(text: &str) -> (&str, &str, String) {
    let text = text.trim();
    let (body, varargs) = match text.strip_suffix("...") {
        Some(stripped) => (stripped, true),
        None => (text, false),
    };
    let (base, after_base) = match body.find(|c| c == '<' || c == '[') {
        Some(i) => body.split_at(i),
        None => (body, ""),
    };
    let (args, rest) = if after_base.starts_with('<') {
        let mut depth = 0usize;
        let mut end = after_base.len();
        for (i, c) in after_base.char_indices() {
            match c {
                '<' => depth += 1,
                '>' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        end = i + 1;
                        break;
                    }
                }
                _ => {}
            }
        }
        after_base.split_at(end)
    } else {
        ("", after_base)
    };
    let mut dims = "[]".repeat(rest.matches('[').count());
    if varargs {
        dims.push_str("[]");
    }
    (base, args, dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::java::JavaParser;
    use std::path::Path;

    fn index(files: &[(&str, &str)]) -> (ProjectIndex, Vec<FileSyntax>) {
        let parser = JavaParser::new().unwrap();
        let parsed: Vec<_> = files
            .iter()
            .map(|(path, src)| parser.parse(Path::new(path), src).unwrap())
            .collect();
        (ProjectIndex::build(&parsed), parsed)
    }

    #[test]
    fn test_split_type() {
        assert_eq!(split_type("Map<K,List<V>>[]"), ("Map", "<K,List<V>>", "[]".to_string()));
        assert_eq!(split_type("String..."), ("String", "", "[]".to_string()));
        assert_eq!(split_type("a.b.C"), ("a.b.C", "", String::new()));
    }

    #[test]
    fn test_resolution_order() {
        let (idx, _) = index(&[
            ("a/Shape.java", "package a; public abstract class Shape { class Part {} }"),
            ("b/Circle.java", "package b; import a.Shape; import c.*; class Circle extends Shape {}"),
            ("c/Tool.java", "package c; public class Tool {}"),
        ]);
        let chain = vec!["b.Circle".to_string()];
        let scope = Scope {
            file: 1,
            chain: &chain,
        };
        assert_eq!(idx.resolve_type("Shape", &scope).unwrap().qualified, "a.Shape");
        assert_eq!(idx.resolve_type("Tool", &scope).unwrap().qualified, "c.Tool");
        assert_eq!(idx.resolve_type("String", &scope).unwrap().qualified, "java.lang.String");
        assert_eq!(idx.resolve_type("Shape.Part", &scope).unwrap().qualified, "a.Shape.Part");
        assert!(idx.resolve_type("Shape.Part", &scope).unwrap().is_nested);
        let unknown = idx.resolve_type("Mystery<Tool>", &scope).unwrap();
        assert_eq!(unknown.qualified, "Mystery<Tool>");
        assert_eq!(unknown.simple, "Mystery");
        assert_eq!(idx.resolve_type("int[]", &scope).unwrap().qualified, "int[]");
    }

    #[test]
    fn test_find_method_walks_hierarchy() {
        let (idx, _) = index(&[(
            "a/A.java",
            r#"package a;
            interface Drawer { void draw(); default void help() {} }
            abstract class Base implements Drawer { abstract int size(); }
            class Impl extends Base { int size() { return 1; } public void draw() {} }"#,
        )]);
        let (owner, m) = idx.find_method("a.Impl", "size").unwrap();
        assert_eq!(owner.qualified, "a.Impl");
        assert!(!m.is_abstract);
        let (owner, m) = idx.find_method("a.Base", "draw").unwrap();
        assert_eq!(owner.qualified, "a.Drawer");
        assert!(m.is_abstract);
        let (_, m) = idx.find_method("a.Base", "help").unwrap();
        assert!(!m.is_abstract);
        assert!(idx.find_method("a.Impl", "missing").is_none());
    }
}

//! Declaration events consumed by the visitor passes.
//!
//! A [`SourceUnit`] is one compilation unit flattened into the order a
//! syntax-tree walk would meet its declarations. Every reference carries the
//! binding the front-end resolved for it; `None` means the binding failed.

use std::path::PathBuf;

/// Declared kind of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
}

/// A resolved type binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    /// Fully-qualified name; generic arguments and array brackets are kept.
    pub qualified: String,
    /// Unqualified name, generic arguments stripped.
    pub simple: String,
    pub is_interface: bool,
    pub is_enum: bool,
    pub is_nested: bool,
}

impl TypeRef {
    /// Binding of the `null` literal.
    pub fn null() -> Self {
        Self::named("null", "null")
    }

    pub fn named(qualified: impl Into<String>, simple: impl Into<String>) -> Self {
        Self {
            qualified: qualified.into(),
            simple: simple.into(),
            is_interface: false,
            is_enum: false,
            is_nested: false,
        }
    }

    pub fn is_null(&self) -> bool {
        self.qualified == "null"
    }

    /// Qualified name without generic arguments.
    pub fn erasure(&self) -> &str {
        erasure(&self.qualified)
    }
}

/// Strip generic arguments: `a.Box<b.Item>` becomes `a.Box`.
pub fn erasure(name: &str) -> &str {
    match name.find('<') {
        Some(i) => &name[..i],
        None => name,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Imported name; the package for on-demand imports.
    pub path: String,
    pub on_demand: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub qualified: String,
    pub simple: String,
    /// Package name components.
    pub package: Vec<String>,
    pub kind: TypeKind,
    pub is_abstract: bool,
    pub is_public: bool,
    pub is_private: bool,
    pub is_nested: bool,
    pub is_anonymous: bool,
    pub superclass: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
}

impl TypeDecl {
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    pub fn to_ref(&self) -> TypeRef {
        TypeRef {
            qualified: self.qualified.clone(),
            simple: self.simple.clone(),
            is_interface: self.is_interface(),
            is_enum: self.is_enum(),
            is_nested: self.is_nested || self.is_anonymous,
        }
    }
}

/// A method or constructor declaration. Modifiers are the written ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: String,
    pub declaring: Option<TypeRef>,
    pub is_constructor: bool,
    pub is_public: bool,
    pub is_abstract: bool,
    pub parameters: Vec<Option<TypeRef>>,
    /// `None` for constructors and unresolved return types.
    pub return_type: Option<TypeRef>,
}

/// One field declaration statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub names: Vec<String>,
    pub field_type: Option<TypeRef>,
}

/// A resolved method invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub method: String,
    /// Type declaring the invoked method.
    pub declaring: TypeRef,
    /// Abstract per the method binding, implicit interface modifiers included.
    pub is_abstract: bool,
}

/// Method enclosing a `return` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclosingMethod {
    pub name: String,
    pub is_constructor: bool,
    pub declaring: Option<TypeRef>,
    pub return_type: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnSite {
    pub enclosing: Option<EnclosingMethod>,
    /// Static type of the returned expression.
    pub expression: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclEvent {
    Import(Import),
    TypeEntered(TypeDecl),
    TypeExited,
    Method(MethodDecl),
    Field(FieldDecl),
    /// `None` when the method binding did not resolve.
    Invocation(Option<Invocation>),
    Return(ReturnSite),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub package: Option<String>,
    pub events: Vec<DeclEvent>,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, package: Option<String>) -> Self {
        Self {
            path: path.into(),
            package,
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, event: DeclEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erasure() {
        assert_eq!(erasure("a.Box<b.Item>"), "a.Box");
        assert_eq!(erasure("a.Box"), "a.Box");
        assert_eq!(TypeRef::named("java.util.Map<K,V>", "Map").erasure(), "java.util.Map");
    }
}

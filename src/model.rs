//! Entity and relationship vocabulary of the analysis graph.
//!
//! Labels are closed sets: a node's primary kind, its visibility, the
//! attributes computed by the passes and the design patterns recognized in
//! it. The string forms are the ones written to the output documents.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Primary kind of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Class,
    Interface,
    Method,
    Constructor,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Class => "CLASS",
            EntityKind::Interface => "INTERFACE",
            EntityKind::Method => "METHOD",
            EntityKind::Constructor => "CONSTRUCTOR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CLASS" => Some(EntityKind::Class),
            "INTERFACE" => Some(EntityKind::Interface),
            "METHOD" => Some(EntityKind::Method),
            "CONSTRUCTOR" => Some(EntityKind::Constructor),
            _ => None,
        }
    }

    /// Class or interface.
    pub fn is_type(&self) -> bool {
        matches!(self, EntityKind::Class | EntityKind::Interface)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Private => "PRIVATE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PUBLIC" => Some(Visibility::Public),
            "PRIVATE" => Some(Visibility::Private),
            _ => None,
        }
    }

    /// Visibility label for a declaration: anything not public is private.
    pub fn of(is_public: bool) -> Self {
        if is_public {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

/// Computed or structural attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    Abstract,
    OutOfScope,
    Vp,
    Variant,
    MethodLevelVp,
    Hotspot,
    Dense,
}

impl Attribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Abstract => "ABSTRACT",
            Attribute::OutOfScope => "OUT_OF_SCOPE",
            Attribute::Vp => "VP",
            Attribute::Variant => "VARIANT",
            Attribute::MethodLevelVp => "METHOD_LEVEL_VP",
            Attribute::Hotspot => "HOTSPOT",
            Attribute::Dense => "DENSE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ABSTRACT" => Some(Attribute::Abstract),
            "OUT_OF_SCOPE" => Some(Attribute::OutOfScope),
            "VP" => Some(Attribute::Vp),
            "VARIANT" => Some(Attribute::Variant),
            "METHOD_LEVEL_VP" => Some(Attribute::MethodLevelVp),
            "HOTSPOT" => Some(Attribute::Hotspot),
            "DENSE" => Some(Attribute::Dense),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DesignPattern {
    Factory,
    Strategy,
    Template,
    Decorator,
    CompositionStrategy,
}

impl DesignPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            DesignPattern::Factory => "FACTORY",
            DesignPattern::Strategy => "STRATEGY",
            DesignPattern::Template => "TEMPLATE",
            DesignPattern::Decorator => "DECORATOR",
            DesignPattern::CompositionStrategy => "COMPOSITION_STRATEGY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FACTORY" => Some(DesignPattern::Factory),
            "STRATEGY" => Some(DesignPattern::Strategy),
            "TEMPLATE" => Some(DesignPattern::Template),
            "DECORATOR" => Some(DesignPattern::Decorator),
            "COMPOSITION_STRATEGY" => Some(DesignPattern::CompositionStrategy),
            _ => None,
        }
    }
}

/// Any label a node can carry.
///
/// The derived ordering (kind, visibility, attribute, pattern) is the order
/// labels appear in serialized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    Kind(EntityKind),
    Visibility(Visibility),
    Attribute(Attribute),
    Pattern(DesignPattern),
}

impl Label {
    pub const CLASS: Label = Label::Kind(EntityKind::Class);
    pub const INTERFACE: Label = Label::Kind(EntityKind::Interface);
    pub const METHOD: Label = Label::Kind(EntityKind::Method);
    pub const CONSTRUCTOR: Label = Label::Kind(EntityKind::Constructor);
    pub const PUBLIC: Label = Label::Visibility(Visibility::Public);
    pub const PRIVATE: Label = Label::Visibility(Visibility::Private);
    pub const ABSTRACT: Label = Label::Attribute(Attribute::Abstract);
    pub const OUT_OF_SCOPE: Label = Label::Attribute(Attribute::OutOfScope);
    pub const VP: Label = Label::Attribute(Attribute::Vp);
    pub const VARIANT: Label = Label::Attribute(Attribute::Variant);
    pub const METHOD_LEVEL_VP: Label = Label::Attribute(Attribute::MethodLevelVp);
    pub const HOTSPOT: Label = Label::Attribute(Attribute::Hotspot);
    pub const DENSE: Label = Label::Attribute(Attribute::Dense);
    pub const FACTORY: Label = Label::Pattern(DesignPattern::Factory);
    pub const STRATEGY: Label = Label::Pattern(DesignPattern::Strategy);
    pub const TEMPLATE: Label = Label::Pattern(DesignPattern::Template);
    pub const DECORATOR: Label = Label::Pattern(DesignPattern::Decorator);
    pub const COMPOSITION_STRATEGY: Label = Label::Pattern(DesignPattern::CompositionStrategy);

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Kind(k) => k.as_str(),
            Label::Visibility(v) => v.as_str(),
            Label::Attribute(a) => a.as_str(),
            Label::Pattern(p) => p.as_str(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        EntityKind::parse(s)
            .map(Label::Kind)
            .or_else(|| Visibility::parse(s).map(Label::Visibility))
            .or_else(|| Attribute::parse(s).map(Label::Attribute))
            .or_else(|| DesignPattern::parse(s).map(Label::Pattern))
    }
}

impl From<EntityKind> for Label {
    fn from(k: EntityKind) -> Self {
        Label::Kind(k)
    }
}

impl From<Visibility> for Label {
    fn from(v: Visibility) -> Self {
        Label::Visibility(v)
    }
}

impl From<Attribute> for Label {
    fn from(a: Attribute) -> Self {
        Label::Attribute(a)
    }
}

impl From<DesignPattern> for Label {
    fn from(p: DesignPattern) -> Self {
        Label::Pattern(p)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationKind {
    /// Type to one of its methods or constructors.
    Method,
    /// Superclass to subclass.
    Extends,
    /// Interface to implementing type.
    Implements,
    /// Composing type to composed type.
    Instantiate,
}

impl RelationKind {
    /// The inheritance relations: EXTENDS and IMPLEMENTS.
    pub const INHERITANCE: [RelationKind; 2] = [RelationKind::Extends, RelationKind::Implements];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Method => "METHOD",
            RelationKind::Extends => "EXTENDS",
            RelationKind::Implements => "IMPLEMENTS",
            RelationKind::Instantiate => "INSTANTIATE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "METHOD" => Some(RelationKind::Method),
            "EXTENDS" => Some(RelationKind::Extends),
            "IMPLEMENTS" => Some(RelationKind::Implements),
            "INSTANTIATE" => Some(RelationKind::Instantiate),
            _ => None,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node properties set by the detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Property {
    MethodVps,
    MethodVariants,
    ConstructorVps,
    ConstructorVariants,
    ClassVariants,
    PublicMethods,
    PublicConstructors,
    AllMethods,
    NbCompositions,
    Hotspot,
    Aggregation,
}

impl Property {
    pub fn as_str(&self) -> &'static str {
        match self {
            Property::MethodVps => "methodVPs",
            Property::MethodVariants => "methodVariants",
            Property::ConstructorVps => "constructorVPs",
            Property::ConstructorVariants => "constructorVariants",
            Property::ClassVariants => "classVariants",
            Property::PublicMethods => "publicMethods",
            Property::PublicConstructors => "publicConstructors",
            Property::AllMethods => "allMethods",
            Property::NbCompositions => "nbCompositions",
            Property::Hotspot => "hotspot",
            Property::Aggregation => "aggregation",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bool(bool),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(_) => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(n as i64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Opaque identity of a node within one graph store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Snapshot of a node: name, labels and properties at the time of reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub labels: BTreeSet<Label>,
    pub properties: BTreeMap<Property, Value>,
}

impl Node {
    pub fn has_label(&self, label: Label) -> bool {
        self.labels.contains(&label)
    }

    /// The primary kind, if the node carries one.
    pub fn kind(&self) -> Option<EntityKind> {
        self.labels.iter().find_map(|l| match l {
            Label::Kind(k) => Some(*k),
            _ => None,
        })
    }

    /// Class or interface node.
    pub fn is_type(&self) -> bool {
        self.has_label(Label::CLASS) || self.has_label(Label::INTERFACE)
    }

    pub fn is_out_of_scope(&self) -> bool {
        self.has_label(Label::OUT_OF_SCOPE)
    }

    pub fn has_design_pattern(&self) -> bool {
        self.labels.iter().any(|l| matches!(l, Label::Pattern(_)))
    }

    pub fn property(&self, prop: Property) -> Option<Value> {
        self.properties.get(&prop).copied()
    }

    /// Integer property, `None` when unset.
    pub fn int(&self, prop: Property) -> Option<i64> {
        self.property(prop).and_then(|v| v.as_int())
    }

    /// Boolean property, `false` when unset.
    pub fn flag(&self, prop: Property) -> bool {
        self.property(prop).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Label strings in serialization order.
    pub fn label_names(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.as_str().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip_names() {
        for name in [
            "CLASS",
            "PRIVATE",
            "OUT_OF_SCOPE",
            "METHOD_LEVEL_VP",
            "COMPOSITION_STRATEGY",
        ] {
            let label = Label::parse(name).unwrap();
            assert_eq!(label.as_str(), name);
        }
        assert_eq!(Label::parse("SINGLETON"), None);
    }

    #[test]
    fn test_label_order_kind_first() {
        let mut labels = BTreeSet::new();
        labels.insert(Label::VP);
        labels.insert(Label::STRATEGY);
        labels.insert(Label::PUBLIC);
        labels.insert(Label::CLASS);
        let names: Vec<_> = labels.iter().map(|l| l.as_str()).collect();
        assert_eq!(names, vec!["CLASS", "PUBLIC", "VP", "STRATEGY"]);
    }

    #[test]
    fn test_node_helpers() {
        let mut node = Node {
            id: NodeId(0),
            name: "a.Shape".to_string(),
            labels: [Label::CLASS, Label::ABSTRACT].into_iter().collect(),
            properties: BTreeMap::new(),
        };
        node.properties.insert(Property::ClassVariants, Value::Int(2));
        assert_eq!(node.kind(), Some(EntityKind::Class));
        assert!(node.is_type());
        assert_eq!(node.int(Property::ClassVariants), Some(2));
        assert_eq!(node.int(Property::MethodVps), None);
        assert!(!node.flag(Property::Hotspot));
    }
}

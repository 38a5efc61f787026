//! Pass 1: type and member discovery.

use tracing::debug;

use crate::graph::{Graph, GraphResult, GraphStore};
use crate::model::{EntityKind, Label, RelationKind, Visibility};
use crate::source::{MethodDecl, TypeDecl};

use super::{Pass, UnitContext, Visit};

/// Creates a node per visited type and one per method or constructor.
#[derive(Debug, Default)]
pub struct DiscoveryPass {
    pub types_created: usize,
    pub members_created: usize,
}

impl DiscoveryPass {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Kind and labels of a declared type. Abstract wins over interface.
pub fn type_labels(decl: &TypeDecl) -> (EntityKind, Vec<Label>) {
    let visibility = Label::from(Visibility::of(decl.is_public));
    if decl.is_abstract {
        (EntityKind::Class, vec![Label::ABSTRACT, visibility])
    } else if decl.is_interface() {
        (EntityKind::Interface, vec![visibility])
    } else {
        (EntityKind::Class, vec![visibility])
    }
}

/// Labels of a member node. Visibility is only recorded for members of
/// public types.
fn member_labels(decl: &MethodDecl, owner_is_public: bool) -> Vec<Label> {
    let mut labels = Vec::new();
    if decl.is_abstract {
        labels.push(Label::ABSTRACT);
    }
    if owner_is_public {
        labels.push(Visibility::of(decl.is_public).into());
    }
    labels
}

impl Pass for DiscoveryPass {
    fn name(&self) -> &'static str {
        "discovery"
    }

    fn enter_type<S: GraphStore>(
        &mut self,
        graph: &mut Graph<S>,
        _ctx: &UnitContext,
        decl: &TypeDecl,
    ) -> GraphResult<Visit> {
        let (kind, labels) = type_labels(decl);
        graph.get_or_create_node(&decl.qualified, kind, &labels, &labels)?;
        self.types_created += 1;
        Ok(Visit::Descend)
    }

    fn method<S: GraphStore>(
        &mut self,
        graph: &mut Graph<S>,
        ctx: &UnitContext,
        decl: &MethodDecl,
    ) -> GraphResult<()> {
        let Some(declaring) = &decl.declaring else {
            debug!("No binding for method {}, skipped", decl.name);
            return Ok(());
        };
        let parent_kind = if declaring.is_interface {
            EntityKind::Interface
        } else {
            EntityKind::Class
        };
        let parent = graph.get_or_create_node(&declaring.qualified, parent_kind, &[], &[])?;

        let owner_is_public = ctx.current_type().map(|t| t.is_public).unwrap_or(false);
        let kind = if decl.is_constructor {
            EntityKind::Constructor
        } else {
            EntityKind::Method
        };
        let member = graph.create_node(&decl.name, kind, &member_labels(decl, owner_is_public))?;
        graph.link(parent.id, member.id, RelationKind::Method)?;
        self.members_created += 1;
        debug!("Method: {}, parent: {}", decl.name, declaring.qualified);
        Ok(())
    }
}

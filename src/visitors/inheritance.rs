//! Pass 2: inheritance linking.

use tracing::debug;

use crate::graph::{Graph, GraphResult, GraphStore};
use crate::model::{EntityKind, Label, NodeId, RelationKind};
use crate::source::{TypeDecl, TypeRef};

use super::resolve::resolve;
use super::{Pass, UnitContext, Visit};

/// Links supertypes to subtypes with EXTENDS and IMPLEMENTS edges.
///
/// Supertypes missing from the graph get an OUT_OF_SCOPE placeholder.
#[derive(Debug, Default)]
pub struct InheritancePass {
    /// Links whose target name differs from what the binding reported, or
    /// that needed a placeholder.
    pub corrected_links: usize,
    pub links: usize,
}

impl InheritancePass {
    pub fn new() -> Self {
        Self::default()
    }

    fn link_supertype<S: GraphStore>(
        &mut self,
        graph: &mut Graph<S>,
        ctx: &UnitContext,
        subtype: &TypeDecl,
        subtype_id: NodeId,
        supertype: &TypeRef,
        relation: RelationKind,
    ) -> GraphResult<()> {
        let kind = match relation {
            RelationKind::Implements => EntityKind::Interface,
            _ => EntityKind::Class,
        };
        let reported = supertype.erasure().to_string();
        let name = match resolve(graph, supertype, ctx.imports())? {
            Some(resolved) => {
                if resolved != reported {
                    self.corrected_links += 1;
                    debug!(
                        "Different {} names for {}: binding {}, resolved {}",
                        relation, subtype.qualified, reported, resolved
                    );
                }
                resolved
            }
            None => {
                self.corrected_links += 1;
                debug!("{} of {} not found, placeholder {}", relation, subtype.qualified, reported);
                reported
            }
        };
        let parent = graph.get_or_create_node(&name, kind, &[Label::OUT_OF_SCOPE], &[])?;
        graph.link(parent.id, subtype_id, relation)?;
        self.links += 1;
        Ok(())
    }
}

impl Pass for InheritancePass {
    fn name(&self) -> &'static str {
        "inheritance"
    }

    fn enter_type<S: GraphStore>(
        &mut self,
        graph: &mut Graph<S>,
        ctx: &UnitContext,
        decl: &TypeDecl,
    ) -> GraphResult<Visit> {
        let kind_label = if decl.is_interface() {
            Label::INTERFACE
        } else {
            Label::CLASS
        };
        let Some(this) = graph.find_by_labels_and_name(&[kind_label], &decl.qualified)? else {
            return Ok(Visit::Descend);
        };
        if let Some(superclass) = &decl.superclass {
            self.link_supertype(
                graph,
                ctx,
                decl,
                this.id,
                superclass,
                RelationKind::Extends,
            )?;
        }
        for interface in &decl.interfaces {
            self.link_supertype(
                graph,
                ctx,
                decl,
                this.id,
                interface,
                RelationKind::Implements,
            )?;
        }
        Ok(Visit::Descend)
    }
}

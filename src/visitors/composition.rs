//! Pass 5: composition edges.

use tracing::debug;

use crate::graph::{Graph, GraphResult, GraphStore};
use crate::model::{EntityKind, Node, RelationKind};
use crate::source::{FieldDecl, Import, MethodDecl, TypeRef};

use super::resolve::resolve;
use super::{Pass, UnitContext};

/// Links a type to the in-scope types it holds as fields, takes as
/// parameters or returns, with INSTANTIATE edges.
#[derive(Debug, Default)]
pub struct CompositionPass {
    pub links: usize,
}

impl CompositionPass {
    pub fn new() -> Self {
        Self::default()
    }

    fn link_once<S: GraphStore>(
        &mut self,
        graph: &mut Graph<S>,
        parent: &Node,
        used: &Node,
    ) -> GraphResult<()> {
        if graph.related_to(parent.id, used.id)? {
            return Ok(());
        }
        debug!("Composition: {} -> {}", parent.name, used.name);
        graph.link(parent.id, used.id, RelationKind::Instantiate)?;
        self.links += 1;
        Ok(())
    }
}

fn kind_of(binding: &TypeRef) -> EntityKind {
    if binding.is_interface {
        EntityKind::Interface
    } else {
        EntityKind::Class
    }
}

/// In-scope node a referenced type resolves to.
fn used_type<S: GraphStore>(
    graph: &Graph<S>,
    binding: &TypeRef,
    imports: &[Import],
) -> GraphResult<Option<Node>> {
    let Some(name) = resolve(graph, binding, imports)? else {
        return Ok(None);
    };
    Ok(graph.find_by_name(&name)?.filter(|n| !n.is_out_of_scope()))
}

impl Pass for CompositionPass {
    fn name(&self) -> &'static str {
        "composition"
    }

    fn field<S: GraphStore>(
        &mut self,
        graph: &mut Graph<S>,
        ctx: &UnitContext,
        decl: &FieldDecl,
    ) -> GraphResult<()> {
        let (Some(field_type), Some(current)) = (&decl.field_type, ctx.current_type()) else {
            return Ok(());
        };
        if field_type.is_enum {
            return Ok(());
        }
        let Some(used) = used_type(graph, field_type, ctx.imports())? else {
            return Ok(());
        };
        let parent = graph.get_or_create_node(&current.qualified, kind_of(&current.to_ref()), &[], &[])?;
        self.link_once(graph, &parent, &used)
    }

    fn method<S: GraphStore>(
        &mut self,
        graph: &mut Graph<S>,
        ctx: &UnitContext,
        decl: &MethodDecl,
    ) -> GraphResult<()> {
        let Some(declaring) = &decl.declaring else {
            return Ok(());
        };
        let parent = graph.get_or_create_node(&declaring.qualified, kind_of(declaring), &[], &[])?;

        for parameter in decl.parameters.iter().flatten() {
            if let Some(used) = used_type(graph, parameter, ctx.imports())? {
                self.link_once(graph, &parent, &used)?;
            }
        }

        if decl.is_constructor {
            return Ok(());
        }
        let Some(return_type) = &decl.return_type else {
            return Ok(());
        };
        // Return types are looked up by name only, and never link a type to itself.
        if let Some(returned) = graph.find_by_name(return_type.erasure())? {
            if !returned.is_out_of_scope() && returned.name != parent.name {
                self.link_once(graph, &parent, &returned)?;
            }
        }
        Ok(())
    }
}

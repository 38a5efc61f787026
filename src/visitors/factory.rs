//! Pass 4: factory detection.

use tracing::debug;

use crate::graph::{Graph, GraphResult, GraphStore};
use crate::model::{EntityKind, Label};
use crate::source::{ReturnSite, TypeDecl};

use super::discovery::type_labels;
use super::{Pass, UnitContext, Visit};

#[derive(Debug, Default)]
pub struct FactoryPass {
    pub factories_by_name: usize,
    pub factories_by_return: usize,
}

impl FactoryPass {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pass for FactoryPass {
    fn name(&self) -> &'static str {
        "factory"
    }

    fn enter_type<S: GraphStore>(
        &mut self,
        graph: &mut Graph<S>,
        _ctx: &UnitContext,
        decl: &TypeDecl,
    ) -> GraphResult<Visit> {
        if decl.qualified.contains("Factory") {
            let (kind, _) = type_labels(decl);
            let node = graph.get_or_create_node(&decl.qualified, kind, &[], &[])?;
            graph.add_label(node.id, Label::FACTORY)?;
            self.factories_by_name += 1;
        }
        Ok(Visit::Descend)
    }

    /// A method returning a subtype of its declared return type, where that
    /// return type has at least two variants, makes its class a factory.
    fn return_site<S: GraphStore>(
        &mut self,
        graph: &mut Graph<S>,
        _ctx: &UnitContext,
        site: &ReturnSite,
    ) -> GraphResult<()> {
        let Some(returned) = &site.expression else {
            return Ok(());
        };
        if returned.is_nested || returned.is_null() {
            return Ok(());
        }
        let Some(method) = &site.enclosing else {
            return Ok(());
        };
        if method.is_constructor {
            return Ok(());
        }
        let (Some(return_type), Some(declaring)) = (&method.return_type, &method.declaring) else {
            return Ok(());
        };

        let return_node = graph.find_by_name(return_type.erasure())?;
        let kind = if declaring.is_interface {
            EntityKind::Interface
        } else {
            EntityKind::Class
        };
        // Created now only if the type is not declared in the project.
        let parsed_class =
            graph.get_or_create_node(declaring.erasure(), kind, &[Label::OUT_OF_SCOPE], &[])?;
        let returned_node = graph.find_by_name(returned.erasure())?;

        if let (Some(return_node), Some(returned_node)) = (return_node, returned_node) {
            if graph.related_to(return_node.id, returned_node.id)?
                && graph.nb_variants(return_node.id)? >= 2
            {
                debug!(
                    "Factory: {} ({} returns {})",
                    parsed_class.name, method.name, returned_node.name
                );
                graph.add_label(parsed_class.id, Label::FACTORY)?;
                self.factories_by_return += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RetryPolicy;
    use crate::model::Node;
    use crate::source::{DeclEvent, EnclosingMethod, SourceUnit, TypeRef};
    use crate::visitors::testing::*;
    use crate::visitors::{run_pass, DiscoveryPass, InheritancePass};

    fn analyze(units: &[SourceUnit]) -> Graph {
        let mut graph = Graph::in_memory(RetryPolicy::immediate(1));
        run_pass(&mut graph, units, &mut DiscoveryPass::new()).unwrap();
        run_pass(&mut graph, units, &mut InheritancePass::new()).unwrap();
        run_pass(&mut graph, units, &mut FactoryPass::new()).unwrap();
        graph
    }

    fn node(graph: &Graph, name: &str) -> Node {
        graph.find_by_name(name).unwrap().unwrap()
    }

    fn returning(owner: &TypeDecl, declared: &TypeDecl, returned: Option<TypeRef>) -> DeclEvent {
        DeclEvent::Return(ReturnSite {
            enclosing: Some(EnclosingMethod {
                name: "create".into(),
                is_constructor: false,
                declaring: Some(type_ref(owner)),
                return_type: Some(type_ref(declared)),
            }),
            expression: returned,
        })
    }

    fn shapes() -> (TypeDecl, Vec<SourceUnit>) {
        let shape = interface("a.Shape");
        let mut circle = class("a.Circle");
        circle.interfaces = vec![type_ref(&shape)];
        let mut square = class("a.Square");
        square.interfaces = vec![type_ref(&shape)];
        let units = vec![
            unit(shape.clone(), Vec::new()),
            unit(circle, Vec::new()),
            unit(square, Vec::new()),
        ];
        (shape, units)
    }

    #[test]
    fn test_factory_by_name() {
        let graph = analyze(&[unit(class("a.ShapeFactory"), Vec::new())]);
        assert!(node(&graph, "a.ShapeFactory").has_label(Label::FACTORY));
    }

    #[test]
    fn test_factory_by_returned_variant() {
        let (shape, mut units) = shapes();
        let maker = class("a.Maker");
        units.push(unit(
            maker.clone(),
            vec![returning(&maker, &shape, Some(named("a.Circle")))],
        ));
        let graph = analyze(&units);
        assert!(node(&graph, "a.Maker").has_label(Label::FACTORY));
    }

    #[test]
    fn test_null_and_nested_returns_ignored() {
        let (shape, mut units) = shapes();
        let maker = class("a.Maker");
        let mut anonymous = named("");
        anonymous.is_nested = true;
        units.push(unit(
            maker.clone(),
            vec![
                returning(&maker, &shape, Some(TypeRef::null())),
                returning(&maker, &shape, Some(anonymous)),
                returning(&maker, &shape, None),
            ],
        ));
        let graph = analyze(&units);
        assert!(!node(&graph, "a.Maker").has_label(Label::FACTORY));
    }

    #[test]
    fn test_return_type_needs_two_variants() {
        let shape = interface("a.Shape");
        let mut circle = class("a.Circle");
        circle.interfaces = vec![type_ref(&shape)];
        let maker = class("a.Maker");
        let units = vec![
            unit(shape.clone(), Vec::new()),
            unit(circle, Vec::new()),
            unit(
                maker.clone(),
                vec![returning(&maker, &shape, Some(named("a.Circle")))],
            ),
        ];
        let graph = analyze(&units);
        assert!(!node(&graph, "a.Maker").has_label(Label::FACTORY));
    }
}

//! Pass 3: strategy, decorator and template method detection.

use tracing::debug;

use crate::graph::{Graph, GraphResult, GraphStore};
use crate::model::{EntityKind, Label, Node};
use crate::source::{FieldDecl, Invocation, TypeDecl};

use super::resolve::resolve;
use super::{Pass, UnitContext};

#[derive(Debug, Default)]
pub struct PatternPass {
    pub strategies: usize,
    pub decorators: usize,
    pub templates: usize,
}

impl PatternPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag `current` DECORATOR when it extends or implements the field type,
    /// the field type has at least two variants and `current` at least one.
    fn check_abstract_decorator<S: GraphStore>(
        &mut self,
        graph: &mut Graph<S>,
        current: &TypeDecl,
        field_node: &Node,
    ) -> GraphResult<()> {
        let Some(current_node) = graph.find_by_name(&current.qualified)? else {
            return Ok(());
        };
        let inherits = graph
            .superclass_of(&current.qualified)?
            .is_some_and(|s| s.id == field_node.id);
        let implements = graph
            .implemented_interfaces_of(&current.qualified)?
            .iter()
            .any(|i| i.id == field_node.id);
        if (inherits || implements)
            && graph.nb_variants(field_node.id)? >= 2
            && graph.nb_variants(current_node.id)? >= 1
        {
            graph.add_label(current_node.id, Label::DECORATOR)?;
            self.decorators += 1;
        }
        Ok(())
    }
}

impl Pass for PatternPass {
    fn name(&self) -> &'static str {
        "strategy/template/decorator"
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
        let Some(name) = resolve(graph, field_type, ctx.imports())? else {
            return Ok(());
        };
        let Some(node) = graph.find_by_name(&name)? else {
            return Ok(());
        };
        if node.is_out_of_scope() {
            return Ok(());
        }

        if field_type.simple.contains("Strategy") || graph.nb_variants(node.id)? >= 2 {
            debug!("Strategy: {} (field of {})", node.name, current.qualified);
            graph.add_label(node.id, Label::STRATEGY)?;
            self.strategies += 1;
        }
        if field_type.simple.contains("Decorator") {
            graph.add_label(node.id, Label::DECORATOR)?;
            self.decorators += 1;
        }
        self.check_abstract_decorator(graph, current, &node)
    }

    fn invocation<S: GraphStore>(
        &mut self,
        graph: &mut Graph<S>,
        ctx: &UnitContext,
        site: &Invocation,
    ) -> GraphResult<()> {
        let declaring = &site.declaring;
        let kind = if declaring.is_interface {
            EntityKind::Interface
        } else {
            EntityKind::Class
        };
        // Created now only if the type is not declared in the project.
        let node = graph.get_or_create_node(declaring.erasure(), kind, &[Label::OUT_OF_SCOPE], &[])?;
        if graph.nb_variants(node.id)? == 0 {
            return Ok(());
        }
        let calls_own_abstract = ctx
            .current_type()
            .is_some_and(|t| t.qualified == declaring.erasure())
            && site.is_abstract;
        if declaring.simple.contains("Template") || calls_own_abstract {
            debug!("Template: {} via {}", node.name, site.method);
            graph.add_label(node.id, Label::TEMPLATE)?;
            self.templates += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RetryPolicy;
    use crate::source::{DeclEvent, FieldDecl, SourceUnit, TypeDecl};
    use crate::visitors::testing::*;
    use crate::visitors::{run_pass, DiscoveryPass, InheritancePass};

    fn analyze(units: &[SourceUnit]) -> Graph {
        let mut graph = Graph::in_memory(RetryPolicy::immediate(1));
        run_pass(&mut graph, units, &mut DiscoveryPass::new()).unwrap();
        run_pass(&mut graph, units, &mut InheritancePass::new()).unwrap();
        run_pass(&mut graph, units, &mut PatternPass::new()).unwrap();
        graph
    }

    fn sub(qualified: &str, parent: &TypeDecl) -> TypeDecl {
        let mut t = class(qualified);
        if parent.is_interface() {
            t.interfaces = vec![type_ref(parent)];
        } else {
            t.superclass = Some(type_ref(parent));
        }
        t
    }

    fn field(t: &TypeDecl) -> DeclEvent {
        DeclEvent::Field(FieldDecl {
            names: vec!["f".into()],
            field_type: Some(type_ref(t)),
        })
    }

    fn node(graph: &Graph, name: &str) -> Node {
        graph.find_by_name(name).unwrap().unwrap()
    }

    #[test]
    fn test_field_type_with_two_variants_is_strategy() {
        let sorter = interface("a.Sorter");
        let quick = sub("a.Quick", &sorter);
        let merge = sub("a.Merge", &sorter);
        let user = class("a.User");
        let graph = analyze(&[
            unit(sorter.clone(), Vec::new()),
            unit(quick, Vec::new()),
            unit(merge, Vec::new()),
            unit(user, vec![field(&sorter)]),
        ]);
        assert!(node(&graph, "a.Sorter").has_label(Label::STRATEGY));
    }

    #[test]
    fn test_strategy_and_decorator_by_name() {
        let strategy = interface("a.PayStrategy");
        let decorator = class("a.BorderDecorator");
        let user = class("a.User");
        let graph = analyze(&[
            unit(strategy.clone(), Vec::new()),
            unit(decorator.clone(), Vec::new()),
            unit(user, vec![field(&strategy), field(&decorator)]),
        ]);
        assert!(node(&graph, "a.PayStrategy").has_label(Label::STRATEGY));
        let d = node(&graph, "a.BorderDecorator");
        assert!(d.has_label(Label::DECORATOR));
        assert!(!d.has_label(Label::STRATEGY));
    }

    #[test]
    fn test_abstract_decorator() {
        let component = interface("a.Component");
        let text = sub("a.Text", &component);
        let mut wrapper = sub("a.Wrapper", &component);
        wrapper.is_abstract = true;
        let bold = sub("a.Bold", &wrapper);
        let graph = analyze(&[
            unit(component.clone(), Vec::new()),
            unit(text, Vec::new()),
            unit(wrapper, vec![field(&component)]),
            unit(bold, Vec::new()),
        ]);
        assert!(node(&graph, "a.Wrapper").has_label(Label::DECORATOR));
        assert!(node(&graph, "a.Component").has_label(Label::STRATEGY));
    }

    #[test]
    fn test_out_of_scope_and_enum_fields_ignored() {
        let mut color = class("a.Color");
        color.kind = crate::source::TypeKind::Enum;
        let user = class("a.User");
        let graph = analyze(&[unit(
            user,
            vec![
                field(&color),
                DeclEvent::Field(FieldDecl {
                    names: vec!["s".into()],
                    field_type: Some(named("java.lang.StrategyHolder")),
                }),
            ],
        )]);
        assert!(graph.find_by_name("a.Color").unwrap().is_none());
        assert!(graph.find_by_name("java.lang.StrategyHolder").unwrap().is_none());
    }

    #[test]
    fn test_template_method_call_to_own_abstract_method() {
        let mut game = class("a.Game");
        game.is_abstract = true;
        let chess = sub("a.Chess", &game);
        let call = DeclEvent::Invocation(Some(Invocation {
            method: "move".into(),
            declaring: type_ref(&game),
            is_abstract: true,
        }));
        let graph = analyze(&[
            unit(game.clone(), vec![DeclEvent::Method(method(&game, "play")), call]),
            unit(chess, Vec::new()),
        ]);
        assert!(node(&graph, "a.Game").has_label(Label::TEMPLATE));
    }

    #[test]
    fn test_template_needs_variants() {
        let mut game = class("a.Game");
        game.is_abstract = true;
        let call = DeclEvent::Invocation(Some(Invocation {
            method: "move".into(),
            declaring: type_ref(&game),
            is_abstract: true,
        }));
        let graph = analyze(&[unit(game, vec![call])]);
        assert!(!node(&graph, "a.Game").has_label(Label::TEMPLATE));
    }

    #[test]
    fn test_template_by_name_from_another_class() {
        let template = class("a.ReportTemplate");
        let pdf = sub("a.PdfReport", &template);
        let user = class("a.User");
        let call = DeclEvent::Invocation(Some(Invocation {
            method: "render".into(),
            declaring: type_ref(&template),
            is_abstract: false,
        }));
        let graph = analyze(&[
            unit(template, Vec::new()),
            unit(pdf, Vec::new()),
            unit(user.clone(), vec![DeclEvent::Method(method(&user, "run")), call]),
        ]);
        assert!(node(&graph, "a.ReportTemplate").has_label(Label::TEMPLATE));
        assert!(!node(&graph, "a.User").has_label(Label::TEMPLATE));
    }

    #[test]
    fn test_abstract_call_into_other_class_is_not_template() {
        let mut game = class("a.Game");
        game.is_abstract = true;
        let chess = sub("a.Chess", &game);
        let player = class("a.Player");
        let call = DeclEvent::Invocation(Some(Invocation {
            method: "move".into(),
            declaring: type_ref(&game),
            is_abstract: true,
        }));
        let graph = analyze(&[
            unit(game, Vec::new()),
            unit(chess, Vec::new()),
            unit(player.clone(), vec![DeclEvent::Method(method(&player, "turn")), call]),
        ]);
        assert!(!node(&graph, "a.Game").has_label(Label::TEMPLATE));
        assert!(!node(&graph, "a.Player").has_label(Label::TEMPLATE));
    }

    #[test]
    fn test_external_declaring_type_becomes_placeholder() {
        let user = class("a.User");
        let call = DeclEvent::Invocation(Some(Invocation {
            method: "add".into(),
            declaring: named("java.util.List"),
            is_abstract: true,
        }));
        let graph = analyze(&[unit(user, vec![call])]);
        assert!(node(&graph, "java.util.List").has_label(Label::OUT_OF_SCOPE));
    }
}

//! Variation point and variant metrics.
//!
//! Every step reads the graph as left by the previous ones and only adds
//! labels or overwrites properties, so running a step twice changes nothing.

use tracing::debug;

use crate::graph::{Graph, GraphResult, GraphStore, HopPattern, NodeFilter};
use crate::model::{Label, NodeId, Property, RelationKind};

/// Overloaded names and the methods taking part in them.
fn overload_groups<S: GraphStore>(
    graph: &Graph<S>,
    id: NodeId,
    label: Label,
) -> GraphResult<(usize, usize)> {
    let groups = graph.count_same_name_children(id, label)?;
    let overloaded = groups.iter().filter(|g| g.number > 1);
    let names = overloaded.clone().count();
    let members = overloaded.map(|g| g.number).sum();
    Ok((names, members))
}

/// Children of `id` carrying every label in `labels`.
fn count_members<S: GraphStore>(
    graph: &Graph<S>,
    id: NodeId,
    labels: &[Label],
) -> GraphResult<usize> {
    Ok(graph
        .children(id, &[])?
        .iter()
        .filter(|c| labels.iter().all(|l| c.has_label(*l)))
        .count())
}

fn classes<S: GraphStore>(graph: &Graph<S>) -> GraphResult<Vec<NodeId>> {
    Ok(graph
        .nodes_matching(&NodeFilter::with(Label::CLASS))?
        .into_iter()
        .map(|n| n.id)
        .collect())
}

/// Number of distinct method names declared more than once in a class.
pub fn set_method_vps<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    for id in classes(graph)? {
        let (names, _) = overload_groups(graph, id, Label::METHOD)?;
        graph.set_property(id, Property::MethodVps, names)?;
    }
    Ok(())
}

/// Number of methods sharing their name with another method of the class.
pub fn set_method_variants<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    for id in classes(graph)? {
        let (_, members) = overload_groups(graph, id, Label::METHOD)?;
        graph.set_property(id, Property::MethodVariants, members)?;
    }
    Ok(())
}

/// 1 when a class has more than one constructor.
pub fn set_constructor_vps<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    for id in classes(graph)? {
        let count = count_members(graph, id, &[Label::CONSTRUCTOR])?;
        graph.set_property(id, Property::ConstructorVps, usize::from(count > 1))?;
    }
    Ok(())
}

/// Number of constructors when there is more than one.
pub fn set_constructor_variants<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    for id in classes(graph)? {
        let count = count_members(graph, id, &[Label::CONSTRUCTOR])?;
        let variants = if count > 1 { count } else { 0 };
        graph.set_property(id, Property::ConstructorVariants, variants)?;
    }
    Ok(())
}

/// Direct subclasses and implementing classes of every class and interface.
pub fn set_nb_variants<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    for node in graph.nodes_matching(&NodeFilter::types())? {
        let variants = graph.nb_variants(node.id)?;
        graph.set_property(node.id, Property::ClassVariants, variants)?;
    }
    Ok(())
}

pub fn set_vp_labels<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    for node in graph.nodes()? {
        if node.is_out_of_scope() {
            continue;
        }
        let is_vp = node.has_label(Label::INTERFACE)
            || (node.has_label(Label::CLASS) && node.has_label(Label::ABSTRACT))
            || node.has_design_pattern()
            || node.int(Property::ClassVariants).unwrap_or(0) > 0;
        if is_vp {
            graph.add_label(node.id, Label::VP)?;
        }
    }
    Ok(())
}

pub fn set_method_level_vp_labels<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    for node in graph.nodes()? {
        if node.is_out_of_scope() {
            continue;
        }
        if node.int(Property::MethodVps).unwrap_or(0) > 0
            || node.int(Property::ConstructorVps).unwrap_or(0) > 0
        {
            graph.add_label(node.id, Label::METHOD_LEVEL_VP)?;
        }
    }
    Ok(())
}

/// Classes and interfaces one inheritance hop below a VP.
pub fn set_variant_labels<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    let pattern = HopPattern::new(
        NodeFilter::with(Label::VP),
        &RelationKind::INHERITANCE,
        NodeFilter::types(),
    );
    for row in graph.run_query(&pattern)? {
        graph.add_label(row.target.id, Label::VARIANT)?;
    }
    Ok(())
}

/// Public methods of public classes. 0 on every other class.
pub fn set_public_methods<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    for node in graph.nodes_matching(&NodeFilter::with(Label::CLASS))? {
        let count = if node.has_label(Label::PUBLIC) {
            count_members(graph, node.id, &[Label::METHOD, Label::PUBLIC])?
        } else {
            0
        };
        graph.set_property(node.id, Property::PublicMethods, count)?;
    }
    Ok(())
}

/// Public constructors of public classes. 0 on every other class.
pub fn set_public_constructors<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    for node in graph.nodes_matching(&NodeFilter::with(Label::CLASS))? {
        let count = if node.has_label(Label::PUBLIC) {
            count_members(graph, node.id, &[Label::CONSTRUCTOR, Label::PUBLIC])?
        } else {
            0
        };
        graph.set_property(node.id, Property::PublicConstructors, count)?;
    }
    Ok(())
}

/// Outgoing INSTANTIATE edges. Left unset on nodes that compose nothing.
pub fn set_nb_compositions<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    for node in graph.nodes()? {
        let composed = graph.children(node.id, &[RelationKind::Instantiate])?.len();
        if composed > 0 {
            graph.set_property(node.id, Property::NbCompositions, composed)?;
        }
    }
    Ok(())
}

pub fn set_all_methods<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    for id in classes(graph)? {
        let count = count_members(graph, id, &[Label::METHOD])?;
        graph.set_property(id, Property::AllMethods, count)?;
    }
    Ok(())
}

/// Types composed by a class or interface and having more than one variant.
pub fn detect_strategies_with_composition<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    let pattern = HopPattern::new(
        NodeFilter::types(),
        &[RelationKind::Instantiate],
        NodeFilter::any_node(),
    );
    for row in graph.run_query(&pattern)? {
        if row.target.int(Property::ClassVariants).unwrap_or(0) > 1 {
            graph.add_label(row.target.id, Label::COMPOSITION_STRATEGY)?;
        }
    }
    Ok(())
}

/// Both ends of an INSTANTIATE edge between two variants.
pub fn detect_density<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    let pattern = HopPattern::new(
        NodeFilter::with(Label::VARIANT),
        &[RelationKind::Instantiate],
        NodeFilter::with(Label::VARIANT),
    );
    for row in graph.run_query(&pattern)? {
        graph.add_label(row.source.id, Label::DENSE)?;
        graph.add_label(row.target.id, Label::DENSE)?;
    }
    Ok(())
}

/// Every metric and label of this module, in dependency order.
pub fn detect_vps_and_variants<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    set_method_vps(graph)?;
    set_method_variants(graph)?;
    set_constructor_vps(graph)?;
    set_constructor_variants(graph)?;
    set_nb_variants(graph)?;
    set_vp_labels(graph)?;
    set_method_level_vp_labels(graph)?;
    set_variant_labels(graph)?;
    set_public_methods(graph)?;
    set_public_constructors(graph)?;
    set_nb_compositions(graph)?;
    set_all_methods(graph)?;
    detect_strategies_with_composition(graph)?;
    detect_density(graph)?;
    debug!("Variation points and variants detected");
    Ok(())
}

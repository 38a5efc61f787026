//! Hotspot detection over the labeled graph.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::{Graph, GraphResult, GraphStore, HopPattern, NodeFilter};
use crate::model::{Label, NodeId, Property, RelationKind};

/// Thresholds of the hotspot rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotspotConfig {
    /// Variants (subtyping) or overloads (overloading) making a hotspot.
    pub nb_variants_threshold: usize,
    /// Size of the INSTANTIATE subgraph making an aggregation hotspot.
    pub nb_aggregations_threshold: usize,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            nb_variants_threshold: 20,
            nb_aggregations_threshold: 5,
        }
    }
}

/// Flag every VP with at least `threshold` distinct variants among its direct
/// successors, whatever the relation, together with those variants.
pub fn detect_subtyping_hotspots<S: GraphStore>(
    graph: &mut Graph<S>,
    threshold: usize,
) -> GraphResult<()> {
    let pattern = HopPattern::new(
        NodeFilter::with(Label::VP),
        &[],
        NodeFilter::with(Label::VARIANT),
    );
    let mut variants_of: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    for row in graph.run_query(&pattern)? {
        variants_of
            .entry(row.source.id)
            .or_default()
            .insert(row.target.id);
    }
    for (vp, variants) in variants_of {
        if variants.len() < threshold {
            continue;
        }
        debug!("Subtyping hotspot: {} with {} variants", vp, variants.len());
        graph.set_property(vp, Property::Hotspot, true)?;
        for variant in variants {
            graph.set_property(variant, Property::Hotspot, true)?;
        }
    }
    Ok(())
}

/// Flag every node whose method and constructor overloads reach `threshold`.
pub fn detect_overloading_hotspots<S: GraphStore>(
    graph: &mut Graph<S>,
    threshold: usize,
) -> GraphResult<()> {
    for node in graph.nodes()? {
        let (Some(methods), Some(constructors)) = (
            node.int(Property::MethodVariants),
            node.int(Property::ConstructorVariants),
        ) else {
            continue;
        };
        if methods + constructors >= threshold as i64 {
            graph.set_property(node.id, Property::Hotspot, true)?;
        }
    }
    Ok(())
}

/// Flag the INSTANTIATE subgraph of every VP when it holds at least
/// `threshold` nodes, then every variant below a flagged node.
pub fn detect_aggregation_hotspots<S: GraphStore>(
    graph: &mut Graph<S>,
    threshold: usize,
) -> GraphResult<()> {
    for vp in graph.nodes_matching(&NodeFilter::with(Label::VP))? {
        let subgraph = graph.reachable(vp.id, RelationKind::Instantiate)?;
        if subgraph.len() < threshold {
            continue;
        }
        debug!("Aggregation hotspot: {} ({} nodes)", vp.name, subgraph.len());
        for id in subgraph {
            graph.set_property(id, Property::Aggregation, true)?;
        }
    }

    let pattern = HopPattern::new(
        NodeFilter::any_node(),
        &RelationKind::INHERITANCE,
        NodeFilter::with(Label::VARIANT),
    );
    // Variants of a flagged variant are flagged too.
    loop {
        let mut changed = false;
        for row in graph.run_query(&pattern)? {
            if row.source.flag(Property::Aggregation) && !row.target.flag(Property::Aggregation) {
                graph.set_property(row.target.id, Property::Aggregation, true)?;
                changed = true;
            }
        }
        if !changed {
            return Ok(());
        }
    }
}

pub fn set_hotspot_labels<S: GraphStore>(graph: &mut Graph<S>) -> GraphResult<()> {
    for node in graph.nodes()? {
        if node.flag(Property::Hotspot) || node.flag(Property::Aggregation) {
            graph.add_label(node.id, Label::HOTSPOT)?;
        }
    }
    Ok(())
}

pub fn detect_hotspots<S: GraphStore>(
    graph: &mut Graph<S>,
    config: &HotspotConfig,
) -> GraphResult<()> {
    detect_subtyping_hotspots(graph, config.nb_variants_threshold)?;
    detect_overloading_hotspots(graph, config.nb_variants_threshold)?;
    detect_aggregation_hotspots(graph, config.nb_aggregations_threshold)?;
    set_hotspot_labels(graph)
}

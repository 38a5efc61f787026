//! Output documents for vpscan results.
//!
//! Two JSON documents are written per run:
//! - the visualization graph (nodes, inheritance and composition links)
//! - the statistics summary, next to it with a `-stats.json` suffix
//!
//! A colored summary is printed to the terminal.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::detect::{format_elapsed, RunSummary, Statistics};
use crate::graph::{Graph, GraphResult, GraphStore, HopPattern, NameCount, NodeFilter};
use crate::model::{Label, Node, Property, RelationKind};

// =============================================================================
// Visualization graph
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationGraph {
    pub nodes: Vec<JsonNode>,
    pub links: Vec<JsonLink>,
    pub allnodes: Vec<JsonNode>,
    pub linkscompose: Vec<JsonLink>,
    pub alllinks: Vec<JsonLink>,
}

/// A class or interface with its metrics. Unset metrics are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonNode {
    pub types: Vec<String>,
    pub name: String,
    #[serde(rename = "methodVPs", default, skip_serializing_if = "Option::is_none")]
    pub method_vps: Option<i64>,
    #[serde(rename = "constructorVPs", default, skip_serializing_if = "Option::is_none")]
    pub constructor_vps: Option<i64>,
    #[serde(rename = "methodVariants", default, skip_serializing_if = "Option::is_none")]
    pub method_variants: Option<i64>,
    #[serde(rename = "constructorVariants", default, skip_serializing_if = "Option::is_none")]
    pub constructor_variants: Option<i64>,
    #[serde(rename = "publicMethods", default, skip_serializing_if = "Option::is_none")]
    pub public_methods: Option<i64>,
    #[serde(rename = "publicConstructors", default, skip_serializing_if = "Option::is_none")]
    pub public_constructors: Option<i64>,
    #[serde(rename = "allMethods", default, skip_serializing_if = "Option::is_none")]
    pub all_methods: Option<i64>,
    pub methods: Vec<NameCount>,
    pub constructors: Vec<NameCount>,
    pub attributes: Vec<NameCount>,
    #[serde(rename = "nbCompositions", default, skip_serializing_if = "Option::is_none")]
    pub nb_compositions: Option<i64>,
    #[serde(rename = "interfaceAttributes", default, skip_serializing_if = "Option::is_none")]
    pub interface_attributes: Option<Vec<NameCount>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl VisualizationGraph {
    pub fn build<S: GraphStore>(graph: &Graph<S>) -> GraphResult<Self> {
        let mut nodes = Vec::new();
        let mut allnodes = Vec::new();
        for node in graph.nodes()? {
            if node.is_out_of_scope() {
                continue;
            }
            if node.has_label(Label::VP)
                || node.has_label(Label::VARIANT)
                || node.has_label(Label::METHOD_LEVEL_VP)
            {
                nodes.push(json_node(graph, &node, false)?);
            }
            if node.is_type() {
                allnodes.push(json_node(graph, &node, true)?);
            }
        }

        let in_scope = || NodeFilter::any_node().without(Label::OUT_OF_SCOPE);
        let links = json_links(
            graph,
            &HopPattern::new(
                NodeFilter::with(Label::VP).without(Label::OUT_OF_SCOPE),
                &RelationKind::INHERITANCE,
                in_scope(),
            ),
        )?;
        let linkscompose = json_links(
            graph,
            &HopPattern::new(
                NodeFilter::with(Label::CLASS).without(Label::OUT_OF_SCOPE),
                &[RelationKind::Instantiate],
                in_scope(),
            ),
        )?;
        let alllinks = json_links(
            graph,
            &HopPattern::new(
                in_scope(),
                &[
                    RelationKind::Extends,
                    RelationKind::Implements,
                    RelationKind::Instantiate,
                ],
                in_scope(),
            ),
        )?;

        Ok(Self {
            nodes,
            links,
            allnodes,
            linkscompose,
            alllinks,
        })
    }
}

fn json_node<S: GraphStore>(
    graph: &Graph<S>,
    node: &Node,
    with_interfaces: bool,
) -> GraphResult<JsonNode> {
    let interface_attributes = if with_interfaces {
        Some(graph.count_same_name_children(node.id, Label::INTERFACE)?)
    } else {
        None
    };
    Ok(JsonNode {
        types: node.label_names(),
        name: node.name.clone(),
        method_vps: node.int(Property::MethodVps),
        constructor_vps: node.int(Property::ConstructorVps),
        method_variants: node.int(Property::MethodVariants),
        constructor_variants: node.int(Property::ConstructorVariants),
        public_methods: node.int(Property::PublicMethods),
        public_constructors: node.int(Property::PublicConstructors),
        all_methods: node.int(Property::AllMethods),
        methods: graph.count_same_name_children(node.id, Label::METHOD)?,
        constructors: graph.count_same_name_children(node.id, Label::CONSTRUCTOR)?,
        attributes: graph.count_same_name_children(node.id, Label::CLASS)?,
        nb_compositions: node.int(Property::NbCompositions),
        interface_attributes,
    })
}

fn json_links<S: GraphStore>(graph: &Graph<S>, pattern: &HopPattern) -> GraphResult<Vec<JsonLink>> {
    Ok(graph
        .run_query(pattern)?
        .into_iter()
        .map(|row| JsonLink {
            source: row.source.name,
            target: row.target.name,
            kind: row.kind.as_str().to_string(),
        })
        .collect())
}

// =============================================================================
// Files
// =============================================================================

/// Statistics file next to `path`: `x.json` becomes `x-stats.json`, any
/// other name gets `-stats.json` appended.
pub fn stats_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stats_name = match file_name.strip_suffix(".json") {
        Some(stem) => format!("{}-stats.json", stem),
        None => format!("{}-stats.json", file_name),
    };
    path.with_file_name(stats_name)
}

/// Outcome of writing both documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputReport {
    pub graph_path: PathBuf,
    pub stats_path: PathBuf,
    pub graph_error: Option<String>,
    pub stats_error: Option<String>,
}

impl OutputReport {
    pub fn is_ok(&self) -> bool {
        self.graph_error.is_none() && self.stats_error.is_none()
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    let content = serde_json::to_string(value)?;
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// Write the visualization graph to `path` and the statistics beside it.
/// Each write is attempted even if the other fails.
pub fn write_outputs(graph: &VisualizationGraph, stats: &Statistics, path: &Path) -> OutputReport {
    let stats_file = stats_path(path);
    let outcome = |target: &Path, result: anyhow::Result<()>| match result {
        Ok(()) => {
            info!("Wrote {}", target.display());
            None
        }
        Err(e) => {
            error!("{:#}", e);
            Some(format!("{:#}", e))
        }
    };
    let graph_error = outcome(path, write_json(path, graph));
    let stats_error = outcome(&stats_file, write_json(&stats_file, stats));
    OutputReport {
        graph_path: path.to_path_buf(),
        stats_path: stats_file,
        graph_error,
        stats_error,
    }
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write the run summary in pretty (human-readable) format.
pub fn write_pretty(source: &str, summary: &RunSummary, outputs: &OutputReport) {
    // Header
    println!();
    print!("  ");
    print!("{}", "vpscan".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Source:   ".dimmed());
    println!("{}", source);
    print!("  {}", "Files:    ".dimmed());
    print!("{} parsed", summary.files_found.saturating_sub(summary.files_failed));
    if summary.files_failed > 0 {
        print!(", {}", format!("{} failed", summary.files_failed).yellow());
    }
    println!();
    print!("  {}", "Elapsed:  ".dimmed());
    println!("{}", format_elapsed(summary.elapsed));
    println!();

    write_stats(&summary.statistics);
    println!();

    println!("  {}", "Graph:".bold());
    println!(
        "    {} nodes, {} relationships ({} inheritance, {} composition)",
        summary.graph.nodes,
        summary.graph.relationships,
        summary.graph.inheritance,
        summary.graph.compositions
    );
    println!(
        "    {}",
        format!(
            "{} of {} inheritance links corrected ({:.2}%)",
            summary.corrected_links,
            summary.inheritance_links,
            summary.corrected_ratio()
        )
        .dimmed()
    );
    println!();

    write_output_line(&outputs.graph_path, outputs.graph_error.as_deref());
    write_output_line(&outputs.stats_path, outputs.stats_error.as_deref());
    println!();
}

fn write_stats(stats: &Statistics) {
    println!("  {}", "Variability:".bold());
    println!(
        "    {:<22} {} ({} class level, {} method level)",
        "VPs",
        stats.vps.to_string().green().bold(),
        stats.class_level_vps,
        stats.method_level_vps
    );
    println!(
        "    {:<22} {} ({} class level, {} method level)",
        "Variants",
        stats.variants.to_string().green().bold(),
        stats.class_level_variants,
        stats.method_level_variants
    );
    println!(
        "    {:<22} {} public of {}",
        "Methods", stats.public_methods, stats.all_methods
    );
    println!("    {:<22} {}", "Public constructors", stats.publics_constructors);
    println!("    {:<22} {}", "Compositions", stats.nb_composition_classes);
}

fn write_output_line(path: &Path, error: Option<&str>) {
    match error {
        None => println!("  {} {}", "✓".green(), path.display()),
        Some(e) => println!("  {} {} {}", "✗".red(), path.display(), e.dimmed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::detect_vps_and_variants;
    use crate::graph::RetryPolicy;
    use crate::model::{EntityKind, NodeId};
    use tempfile::TempDir;

    fn sample() -> Graph {
        let mut g = Graph::in_memory(RetryPolicy::immediate(1));
        let class = |g: &mut Graph, name: &str, labels: &[Label]| -> NodeId {
            g.get_or_create_node(name, EntityKind::Class, labels, &[]).unwrap().id
        };
        let shape = class(&mut g, "a.Shape", &[Label::ABSTRACT, Label::PUBLIC]);
        let circle = class(&mut g, "a.Circle", &[Label::PUBLIC]);
        let canvas = class(&mut g, "a.Canvas", &[Label::PUBLIC]);
        let panel = class(&mut g, "javax.swing.JPanel", &[Label::OUT_OF_SCOPE]);
        let drawable = g
            .get_or_create_node("a.Drawable", EntityKind::Interface, &[Label::PUBLIC], &[])
            .unwrap()
            .id;
        g.link(shape, circle, RelationKind::Extends).unwrap();
        g.link(panel, canvas, RelationKind::Extends).unwrap();
        g.link(drawable, circle, RelationKind::Implements).unwrap();
        g.link(canvas, shape, RelationKind::Instantiate).unwrap();
        g.link(canvas, drawable, RelationKind::Instantiate).unwrap();
        for _ in 0..2 {
            let m = g.create_node("draw", EntityKind::Method, &[Label::PUBLIC]).unwrap();
            g.link(circle, m.id, RelationKind::Method).unwrap();
        }
        detect_vps_and_variants(&mut g).unwrap();
        g
    }

    fn names(nodes: &[JsonNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_nodes_and_allnodes() {
        let vis = VisualizationGraph::build(&sample()).unwrap();
        assert_eq!(names(&vis.nodes), vec!["a.Shape", "a.Circle", "a.Drawable"]);
        assert_eq!(
            names(&vis.allnodes),
            vec!["a.Shape", "a.Circle", "a.Canvas", "a.Drawable"]
        );
        let circle = &vis.nodes[1];
        assert_eq!(circle.types, vec!["CLASS", "PUBLIC", "VARIANT", "METHOD_LEVEL_VP"]);
        assert_eq!(
            circle.methods,
            vec![NameCount {
                name: "draw".into(),
                number: 2
            }]
        );
        assert!(circle.interface_attributes.is_none());
        assert!(vis.allnodes[1].interface_attributes.is_some());
    }

    #[test]
    fn test_links_exclude_out_of_scope() {
        let vis = VisualizationGraph::build(&sample()).unwrap();
        let link = |s: &str, t: &str, k: &str| JsonLink {
            source: s.into(),
            target: t.into(),
            kind: k.into(),
        };
        assert_eq!(
            vis.links,
            vec![
                link("a.Shape", "a.Circle", "EXTENDS"),
                link("a.Drawable", "a.Circle", "IMPLEMENTS"),
            ]
        );
        assert_eq!(
            vis.linkscompose,
            vec![
                link("a.Canvas", "a.Shape", "INSTANTIATE"),
                link("a.Canvas", "a.Drawable", "INSTANTIATE"),
            ]
        );
        assert_eq!(vis.alllinks.len(), 4);
        assert!(vis.alllinks.iter().all(|l| l.source != "javax.swing.JPanel"));
    }

    #[test]
    fn test_node_json_shape() {
        let vis = VisualizationGraph::build(&sample()).unwrap();
        let json = serde_json::to_value(&vis).unwrap();
        let drawable = &json["nodes"][2];
        assert_eq!(drawable["name"], "a.Drawable");
        // Interfaces get no class metrics.
        assert!(drawable.get("methodVPs").is_none());
        assert!(drawable.get("nbCompositions").is_none());
        assert!(drawable.get("interfaceAttributes").is_none());
        let canvas = &json["allnodes"][2];
        assert_eq!(canvas["nbCompositions"], 2);
        assert_eq!(canvas["methodVPs"], 0);
        assert!(canvas["interfaceAttributes"].is_array());
    }

    #[test]
    fn test_stats_path() {
        assert_eq!(stats_path(Path::new("out/db.json")), PathBuf::from("out/db-stats.json"));
        assert_eq!(stats_path(Path::new("graph")), PathBuf::from("graph-stats.json"));
        assert_eq!(stats_path(Path::new("a.txt")), PathBuf::from("a.txt-stats.json"));
    }

    #[test]
    fn test_write_outputs_creates_directories() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("generated/db.json");
        let vis = VisualizationGraph::build(&sample()).unwrap();
        let report = write_outputs(&vis, &Statistics::default(), &path);
        assert!(report.is_ok());
        let written: VisualizationGraph =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, vis);
        let stats: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(temp.path().join("generated/db-stats.json")).unwrap())
                .unwrap();
        assert_eq!(stats["VPs"], 0);
    }

    #[test]
    fn test_failed_write_does_not_block_the_other() {
        let temp = TempDir::new().unwrap();
        // A directory where the graph file should go.
        let path = temp.path().join("db.json");
        fs::create_dir(&path).unwrap();
        let vis = VisualizationGraph::build(&sample()).unwrap();
        let report = write_outputs(&vis, &Statistics::default(), &path);
        assert!(report.graph_error.is_some());
        assert!(report.stats_error.is_none());
        assert!(temp.path().join("db-stats.json").is_file());
    }
}

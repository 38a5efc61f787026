//! Analysis runner that orchestrates every pass and detector.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::info;

use crate::config::Config;
use crate::graph::{Graph, GraphResult, GraphStore, GraphSummary, RetryPolicy};
use crate::source::{self, SourceUnit};
use crate::visitors::{
    run_pass, CompositionPass, DiscoveryPass, FactoryPass, InheritancePass, PassReport,
    PatternPass,
};

use super::{detect_hotspots, detect_vps_and_variants, HotspotConfig, Statistics};

/// What one run did.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub files_found: usize,
    pub files_failed: usize,
    pub types_indexed: usize,
    pub passes: Vec<PassReport>,
    pub inheritance_links: usize,
    pub corrected_links: usize,
    pub statistics: Statistics,
    pub graph: GraphSummary,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Share of inheritance links that needed manual resolution, in percent.
    pub fn corrected_ratio(&self) -> f64 {
        if self.inheritance_links == 0 {
            0.0
        } else {
            self.corrected_links as f64 * 100.0 / self.inheritance_links as f64
        }
    }
}

/// `HH:MM:SS.mmm`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    let secs = millis / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        millis % 1000
    )
}

/// Runs the passes and detectors over a set of source units.
pub struct Runner {
    hotspots: HotspotConfig,
    retry: RetryPolicy,
    excluded_paths: Vec<String>,
}

impl Runner {
    pub fn new(config: &Config) -> Self {
        Self {
            hotspots: config.hotspots,
            retry: config.store.retry.policy(),
            excluded_paths: config.excluded_paths.clone(),
        }
    }

    /// Load every Java file under `source_dir` and analyze it in a fresh
    /// in-memory graph.
    pub fn run(&self, source_dir: &Path) -> anyhow::Result<(Graph, RunSummary)> {
        let started = Instant::now();
        let project = source::load_project(source_dir, &self.excluded_paths)?;
        info!(
            "Loaded {} files ({} failed), {} types",
            project.files_found, project.files_failed, project.types_indexed
        );

        let mut graph = Graph::in_memory(self.retry);
        graph.clear()?;
        let mut summary = self.analyze(&mut graph, &project.units)?;
        summary.files_found = project.files_found;
        summary.files_failed = project.files_failed;
        summary.types_indexed = project.types_indexed;
        summary.elapsed = started.elapsed();
        Ok((graph, summary))
    }

    /// The five passes in order, each a full sweep over `units`, then the
    /// variant and hotspot detectors.
    pub fn analyze<S: GraphStore>(
        &self,
        graph: &mut Graph<S>,
        units: &[SourceUnit],
    ) -> GraphResult<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        summary.passes.push(self.timed(run_pass(graph, units, &mut DiscoveryPass::new())?));
        let mut inheritance = InheritancePass::new();
        summary.passes.push(self.timed(run_pass(graph, units, &mut inheritance)?));
        summary.passes.push(self.timed(run_pass(graph, units, &mut PatternPass::new())?));
        summary.passes.push(self.timed(run_pass(graph, units, &mut FactoryPass::new())?));
        summary.passes.push(self.timed(run_pass(graph, units, &mut CompositionPass::new())?));
        summary.inheritance_links = inheritance.links;
        summary.corrected_links = inheritance.corrected_links;

        let detect_started = Instant::now();
        detect_vps_and_variants(graph)?;
        info!("variants: {}", format_elapsed(detect_started.elapsed()));
        let hotspot_started = Instant::now();
        detect_hotspots(graph, &self.hotspots)?;
        info!("hotspots: {}", format_elapsed(hotspot_started.elapsed()));

        summary.statistics = Statistics::collect(graph)?;
        summary.graph = graph.summary()?;
        summary.elapsed = started.elapsed();

        info!(
            "Statistics: {}",
            serde_json::to_string(&summary.statistics).unwrap_or_default()
        );
        info!("Graph: {}", summary.graph);
        info!(
            "Corrected inheritance links: {}/{} ({:.2}%, implicit java.lang.Object supertypes not linked)",
            summary.corrected_links,
            summary.inheritance_links,
            summary.corrected_ratio()
        );
        Ok(summary)
    }

    fn timed(&self, report: PassReport) -> PassReport {
        info!("{} pass: {}", report.pass, format_elapsed(report.elapsed));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Label;
    use crate::visitors::testing::*;
    use tempfile::TempDir;

    fn config(threshold: usize) -> Config {
        let mut config = Config::default();
        config.hotspots.nb_variants_threshold = threshold;
        config.store.retry.delay_ms = 0;
        config
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(0)), "00:00:00.000");
        assert_eq!(format_elapsed(Duration::from_millis(3_723_045)), "01:02:03.045");
    }

    #[test]
    fn test_analyze_runs_every_pass_in_order() {
        let mut shape = class("a.Shape");
        shape.is_abstract = true;
        let mut circle = class("a.Circle");
        circle.superclass = Some(type_ref(&shape));
        let mut square = class("a.Square");
        square.superclass = Some(type_ref(&shape));
        let units = vec![unit(circle, Vec::new()), unit(square, Vec::new()), unit(shape, Vec::new())];

        let mut graph = Graph::in_memory(RetryPolicy::immediate(1));
        let summary = Runner::new(&config(2)).analyze(&mut graph, &units).unwrap();

        let names: Vec<&str> = summary.passes.iter().map(|p| p.pass).collect();
        assert_eq!(
            names,
            vec!["discovery", "inheritance", "strategy/template/decorator", "factory", "composition"]
        );
        assert_eq!(summary.inheritance_links, 2);
        assert_eq!(summary.corrected_links, 0);
        assert_eq!(summary.statistics.class_level_vps, 1);
        assert_eq!(summary.statistics.class_level_variants, 2);
        let shape = graph.find_by_name("a.Shape").unwrap().unwrap();
        assert!(shape.has_label(Label::HOTSPOT));
    }

    #[test]
    fn test_run_on_source_tree() {
        let temp = TempDir::new().unwrap();
        let pkg = temp.path().join("src/a");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("Shape.java"), "package a;\npublic interface Shape { void draw(); }\n")
            .unwrap();
        std::fs::write(
            pkg.join("Circle.java"),
            "package a;\npublic class Circle implements Shape { public void draw() {} }\n",
        )
        .unwrap();
        let tests = temp.path().join("src/test");
        std::fs::create_dir_all(&tests).unwrap();
        std::fs::write(tests.join("Ignored.java"), "package test;\npublic class Ignored {}\n").unwrap();

        let (graph, summary) = Runner::new(&config(20)).run(temp.path()).unwrap();
        assert_eq!(summary.files_found, 2);
        assert_eq!(summary.files_failed, 0);
        assert!(graph.find_by_name("test.Ignored").unwrap().is_none());
        let circle = graph.find_by_name("a.Circle").unwrap().unwrap();
        assert!(circle.has_label(Label::VARIANT));
    }
}

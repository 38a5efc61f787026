//! Declaration passes over the event streams.
//!
//! Each pass is one sweep over every [`SourceUnit`]. The driver applies the
//! exclusions shared by all passes and keeps the per-unit context (imports
//! and the stack of entered types); passes only see the events of types they
//! are allowed to visit.

mod composition;
mod discovery;
mod factory;
mod inheritance;
mod patterns;
pub mod resolve;

pub use composition::CompositionPass;
pub use discovery::DiscoveryPass;
pub use factory::FactoryPass;
pub use inheritance::InheritancePass;
pub use patterns::PatternPass;

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::graph::{Graph, GraphResult, GraphStore};
use crate::source::{
    DeclEvent, FieldDecl, Import, Invocation, MethodDecl, ReturnSite, SourceUnit, TypeDecl,
};

/// Package name components that mark test code.
const TEST_PACKAGE_COMPONENTS: &[&str] = &["test", "tests"];

/// Whether the driver delivers a type's contents to the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Descend,
    Skip,
}

/// What a pass sees of the unit being visited.
#[derive(Debug, Default)]
pub struct UnitContext {
    imports: Vec<Import>,
    types: Vec<TypeDecl>,
}

impl UnitContext {
    /// Non-static imports of the unit, in declaration order.
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// Innermost type being visited.
    pub fn current_type(&self) -> Option<&TypeDecl> {
        self.types.last()
    }
}

/// One analysis pass. Handlers default to no-ops.
pub trait Pass {
    fn name(&self) -> &'static str;

    fn enter_type<S: GraphStore>(
        &mut self,
        _graph: &mut Graph<S>,
        _ctx: &UnitContext,
        _decl: &TypeDecl,
    ) -> GraphResult<Visit> {
        Ok(Visit::Descend)
    }

    fn exit_type<S: GraphStore>(
        &mut self,
        _graph: &mut Graph<S>,
        _ctx: &UnitContext,
        _decl: &TypeDecl,
    ) -> GraphResult<()> {
        Ok(())
    }

    fn method<S: GraphStore>(
        &mut self,
        _graph: &mut Graph<S>,
        _ctx: &UnitContext,
        _decl: &MethodDecl,
    ) -> GraphResult<()> {
        Ok(())
    }

    fn field<S: GraphStore>(
        &mut self,
        _graph: &mut Graph<S>,
        _ctx: &UnitContext,
        _decl: &FieldDecl,
    ) -> GraphResult<()> {
        Ok(())
    }

    fn invocation<S: GraphStore>(
        &mut self,
        _graph: &mut Graph<S>,
        _ctx: &UnitContext,
        _site: &Invocation,
    ) -> GraphResult<()> {
        Ok(())
    }

    fn return_site<S: GraphStore>(
        &mut self,
        _graph: &mut Graph<S>,
        _ctx: &UnitContext,
        _site: &ReturnSite,
    ) -> GraphResult<()> {
        Ok(())
    }
}

/// Why a type is never visited, if it is excluded.
pub fn exclusion_reason(decl: &TypeDecl) -> Option<&'static str> {
    if decl
        .package
        .iter()
        .any(|c| TEST_PACKAGE_COMPONENTS.contains(&c.as_str()))
    {
        Some("test package")
    } else if decl.is_nested && decl.is_private {
        Some("private nested type")
    } else if decl.is_enum() {
        Some("enum")
    } else if decl.is_anonymous {
        Some("anonymous class")
    } else {
        None
    }
}

/// Counters for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub pass: &'static str,
    pub units: usize,
    pub types_visited: usize,
    pub types_skipped: usize,
    pub elapsed: Duration,
}

/// Run `pass` over every unit, in order.
pub fn run_pass<P: Pass, S: GraphStore>(
    graph: &mut Graph<S>,
    units: &[SourceUnit],
    pass: &mut P,
) -> GraphResult<PassReport> {
    let started = Instant::now();
    let mut report = PassReport {
        pass: pass.name(),
        ..PassReport::default()
    };

    for unit in units {
        report.units += 1;
        let mut ctx = UnitContext::default();
        // Depth inside a skipped type; its nested types are skipped with it.
        let mut skip_depth = 0usize;

        for event in &unit.events {
            match event {
                DeclEvent::Import(import) => {
                    if !import.is_static {
                        ctx.imports.push(import.clone());
                    }
                }
                DeclEvent::TypeEntered(decl) => {
                    if skip_depth > 0 {
                        skip_depth += 1;
                        continue;
                    }
                    let visit = match exclusion_reason(decl) {
                        Some(reason) => {
                            debug!("{}: skipping {} ({})", report.pass, decl.qualified, reason);
                            Visit::Skip
                        }
                        None => pass.enter_type(graph, &ctx, decl)?,
                    };
                    match visit {
                        Visit::Skip => {
                            report.types_skipped += 1;
                            skip_depth = 1;
                        }
                        Visit::Descend => {
                            report.types_visited += 1;
                            ctx.types.push(decl.clone());
                        }
                    }
                }
                DeclEvent::TypeExited => {
                    if skip_depth > 0 {
                        skip_depth -= 1;
                        continue;
                    }
                    if let Some(decl) = ctx.types.pop() {
                        pass.exit_type(graph, &ctx, &decl)?;
                    }
                }
                _ if skip_depth > 0 => {}
                DeclEvent::Method(decl) => pass.method(graph, &ctx, decl)?,
                DeclEvent::Field(decl) => pass.field(graph, &ctx, decl)?,
                DeclEvent::Invocation(Some(site)) => pass.invocation(graph, &ctx, site)?,
                DeclEvent::Invocation(None) => {}
                DeclEvent::Return(site) => pass.return_site(graph, &ctx, site)?,
            }
        }
    }

    report.elapsed = started.elapsed();
    info!(
        "{}: {} units, {} types visited, {} skipped in {:?}",
        report.pass, report.units, report.types_visited, report.types_skipped, report.elapsed
    );
    Ok(report)
}

//! Heuristic resolution of referenced types to graph node names.
//!
//! Bindings of types outside the analyzed sources are often incomplete, so
//! the name a binding reports is not always the name of the node that
//! represents it. Strategies are tried in order and the first hit wins.

use crate::graph::{Graph, GraphResult, GraphStore};
use crate::source::{erasure, Import, TypeRef};

/// Node name for `binding`, or `None` when the type is out of scope.
pub fn resolve<S: GraphStore>(
    graph: &Graph<S>,
    binding: &TypeRef,
    imports: &[Import],
) -> GraphResult<Option<String>> {
    if let Some(name) = exact_match(graph, binding)? {
        return Ok(Some(name));
    }
    if let Some(name) = single_import_match(binding, imports) {
        return Ok(Some(name));
    }
    on_demand_import_match(graph, binding, imports)
}

/// The binding's erased qualified name, if a node carries it.
pub fn exact_match<S: GraphStore>(graph: &Graph<S>, binding: &TypeRef) -> GraphResult<Option<String>> {
    let name = binding.erasure();
    Ok(graph.find_by_name(name)?.map(|_| name.to_string()))
}

/// The first single-type import whose last segment is the binding's simple
/// name. The import need not be in the graph.
pub fn single_import_match(binding: &TypeRef, imports: &[Import]) -> Option<String> {
    let suffix = format!(".{}", erasure(&binding.simple));
    imports
        .iter()
        .find(|i| !i.on_demand && i.path.ends_with(&suffix))
        .map(|i| i.path.clone())
}

/// The first class or interface named like the binding inside one of the
/// on-demand imported packages, in import order.
pub fn on_demand_import_match<S: GraphStore>(
    graph: &Graph<S>,
    binding: &TypeRef,
    imports: &[Import],
) -> GraphResult<Option<String>> {
    let simple = erasure(&binding.simple);
    for import in imports.iter().filter(|i| i.on_demand) {
        if let Some(node) = graph.find_in_package(simple, &import.path)? {
            return Ok(Some(node.name));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RetryPolicy;
    use crate::model::EntityKind;

    fn import(path: &str, on_demand: bool) -> Import {
        Import {
            path: path.to_string(),
            on_demand,
            is_static: false,
        }
    }

    fn graph_with(names: &[&str]) -> Graph {
        let mut g = Graph::in_memory(RetryPolicy::immediate(1));
        for n in names {
            g.create_node(n, EntityKind::Class, &[]).unwrap();
        }
        g
    }

    #[test]
    fn test_exact_match_uses_erasure() {
        let g = graph_with(&["a.Box"]);
        let binding = TypeRef::named("a.Box<a.Item>", "Box");
        assert_eq!(resolve(&g, &binding, &[]).unwrap().as_deref(), Some("a.Box"));
    }

    #[test]
    fn test_single_import_suffix() {
        let g = graph_with(&[]);
        let binding = TypeRef::named("Shape", "Shape");
        let imports = [import("x.y.Shaper", false), import("x.y.Shape", false)];
        assert_eq!(
            resolve(&g, &binding, &imports).unwrap().as_deref(),
            Some("x.y.Shape")
        );
    }

    #[test]
    fn test_on_demand_probe_first_import_wins() {
        let g = graph_with(&["p2.Shape", "p1.Shape"]);
        let binding = TypeRef::named("Shape", "Shape");
        let imports = [import("p0", true), import("p1", true), import("p2", true)];
        assert_eq!(
            resolve(&g, &binding, &imports).unwrap().as_deref(),
            Some("p1.Shape")
        );
    }

    #[test]
    fn test_out_of_scope() {
        let g = graph_with(&["a.Other"]);
        let binding = TypeRef::named("java.util.List<a.Other>", "List");
        assert_eq!(resolve(&g, &binding, &[import("a", true)]).unwrap(), None);
    }
}

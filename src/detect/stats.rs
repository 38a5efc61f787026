//! Whole-graph aggregates written to the statistics document.

use serde::{Deserialize, Serialize};

use crate::graph::{Graph, GraphResult, GraphStore, NodeFilter};
use crate::model::{Label, Node, Property};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(rename = "VPs")]
    pub vps: i64,
    #[serde(rename = "methodsVPs")]
    pub methods_vps: i64,
    #[serde(rename = "constructorsVPs")]
    pub constructors_vps: i64,
    #[serde(rename = "methodLevelVPs")]
    pub method_level_vps: i64,
    #[serde(rename = "classLevelVPs")]
    pub class_level_vps: i64,
    pub variants: i64,
    #[serde(rename = "methodsVariants")]
    pub methods_variants: i64,
    #[serde(rename = "constructorsVariants")]
    pub constructors_variants: i64,
    #[serde(rename = "methodLevelVariants")]
    pub method_level_variants: i64,
    #[serde(rename = "classLevelVariants")]
    pub class_level_variants: i64,
    #[serde(rename = "publicMethods")]
    pub public_methods: i64,
    #[serde(rename = "allMethods")]
    pub all_methods: i64,
    #[serde(rename = "publicsConstructors")]
    pub publics_constructors: i64,
    #[serde(rename = "nbCompositionClasses")]
    pub nb_composition_classes: i64,
}

fn sum(classes: &[Node], prop: Property) -> i64 {
    classes.iter().filter_map(|c| c.int(prop)).sum()
}

impl Statistics {
    pub fn collect<S: GraphStore>(graph: &Graph<S>) -> GraphResult<Self> {
        let classes = graph.nodes_matching(&NodeFilter::with(Label::CLASS))?;
        let class_level_vps = graph.nodes_matching(&NodeFilter::with(Label::VP))?.len() as i64;
        let class_level_variants = graph
            .nodes_matching(&NodeFilter::with(Label::VARIANT).without(Label::VP))?
            .len() as i64;

        let methods_vps = sum(&classes, Property::MethodVps);
        let constructors_vps = sum(&classes, Property::ConstructorVps);
        let method_level_vps = methods_vps + constructors_vps;
        let methods_variants = sum(&classes, Property::MethodVariants);
        let constructors_variants = sum(&classes, Property::ConstructorVariants);
        let method_level_variants = methods_variants + constructors_variants;

        Ok(Self {
            vps: class_level_vps + method_level_vps,
            methods_vps,
            constructors_vps,
            method_level_vps,
            class_level_vps,
            variants: class_level_variants + method_level_variants,
            methods_variants,
            constructors_variants,
            method_level_variants,
            class_level_variants,
            public_methods: sum(&classes, Property::PublicMethods),
            all_methods: sum(&classes, Property::AllMethods),
            publics_constructors: sum(&classes, Property::PublicConstructors),
            nb_composition_classes: sum(&classes, Property::NbCompositions),
        })
    }
}

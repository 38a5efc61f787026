//! Detectors run over the populated graph.

mod hotspots;
mod runner;
mod stats;
mod variants;

pub use hotspots::{
    detect_aggregation_hotspots, detect_hotspots, detect_overloading_hotspots,
    detect_subtyping_hotspots, set_hotspot_labels, HotspotConfig,
};
pub use runner::{format_elapsed, RunSummary, Runner};
pub use stats::Statistics;
pub use variants::{
    detect_density, detect_strategies_with_composition, detect_vps_and_variants, set_all_methods,
    set_constructor_variants, set_constructor_vps, set_method_level_vp_labels,
    set_method_variants, set_method_vps, set_nb_compositions, set_nb_variants,
    set_public_constructors, set_public_methods, set_variant_labels, set_vp_labels,
};

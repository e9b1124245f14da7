//! Multiple patterning layout decomposition: assigns one of K colors to
//! every layout pattern so that patterns within the coloring distance
//! differ, optionally splitting patterns with stitches when no proper
//! assignment exists.

// useful additional warnings if docs are missing, or crates imported but unused, etc.
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![warn(trivial_casts, trivial_numeric_casts)]
#![warn(unsafe_code)]
#![warn(unused_extern_crates)]
#![warn(variant_size_differences)]

// not sure if already by default in clippy
#![warn(clippy::similar_names)]
#![warn(clippy::shadow_unrelated)]
#![warn(clippy::shadow_same)]
#![warn(clippy::shadow_reuse)]


/// axis-aligned geometry: rectangles, patterns, spatial index entries
pub mod geometry;

/// vertex and color types, weighted component graphs, solver contract
pub mod color;

/// layout database: options, ingestion, deduplication, spatial index
pub mod layout;

/// read/write the normalized json layout form
pub mod layout_json;

/// read the line-oriented text layout form
pub mod layout_text;

/// conflict-graph construction from proximity and path hints
pub mod graph;

/// connected-component decomposition
pub mod component;

/// reversible graph simplification (hide small degree, biconnected split)
pub mod simplify;

/// coloring backends
pub mod solvers;

/// stitch insertion (projection before coloring)
pub mod stitch;

/// conflict and stitch tallies
pub mod report;

/// the decomposition pipeline driver
pub mod decompose;

/// helper and utility methods for executables
pub mod util;

// artscope: survey text analysis for art spaces
//
// This is the library root. Each module is one stage of the batch pipeline
// (extract → tabular merge → normalize → topics → output), plus the
// orchestration and the optional SQLite export.

pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod tabular;
pub mod topics;

#[cfg(feature = "sqlite")]
pub mod db;

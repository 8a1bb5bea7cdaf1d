//! Asset handling shared by the pipeline stages.
//!
//! - `scan`: source tree enumeration
//! - `copy`: reference mapping and concurrent copies
//! - `minify`: JS / CSS / HTML minification

mod copy;
pub mod minify;
mod scan;

pub use copy::{PathFilter, PathMapper, copy_file, copy_resources, reset_dir, strip_query};
pub use scan::{collect_all_files, collect_with_extension};

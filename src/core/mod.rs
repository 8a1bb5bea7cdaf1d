//! Process-wide state shared by the orchestrators.

mod state;

pub use state::{MarkerGuard, is_shutdown, marker_present, setup_shutdown_handler};

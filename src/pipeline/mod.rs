//! Pipeline entry points for CLI operations.
//!
//! - `run_search` / `run_discover`: place search with isochrone regions
//! - `run_route`: fetch a walking route and replay it through the regions
//! - `run_replay`: replay a recorded track against a set of regions
//! - `run_validate`: check a configuration file

pub mod replay;
pub mod route;
pub mod search;
pub mod session;
pub mod validate;

pub use replay::{load_regions, load_track, run_replay};
pub use route::run_route;
pub use search::{run_discover, run_search};
pub use session::Session;
pub use validate::run_validate;

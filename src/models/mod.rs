//! Core data models: raw game records and the outcomes extracted from them.

mod faction;
mod game;
mod ids;
mod map;
mod options;
mod outcome;

pub use faction::*;
pub use game::*;
pub use ids::*;
pub use map::*;
pub use options::*;
pub use outcome::*;

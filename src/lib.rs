pub mod api;
pub mod balancer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod mobility;
pub mod optimizer;
pub mod resolver;
pub mod roster;
pub mod scorer;

pub use api::{PlacementEngine, PlacementOutcome};
pub use config::Config;
pub use error::{PlResult, PlacementError};
pub use roster::Roster;

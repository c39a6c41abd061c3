pub mod controller;
pub mod ingest;
pub mod state;

pub use controller::SessionController;
pub use ingest::{Observation, RawObservation};
pub use state::{LiveStatus, LiveStatusBoard};

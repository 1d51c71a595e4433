mod controller;
mod state;

pub use controller::Session;
pub use state::{CallOutcome, ConnectOutcome, EstablishedCall, Phase, SessionSnapshot};

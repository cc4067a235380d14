pub mod client;
pub mod context;
pub mod controller;
pub mod error;
pub mod evaluator;
pub mod normalize;
pub mod notify;
pub mod session;

pub use client::{DockerClient, ExecutionClient, PistonClient};
pub use controller::{RunController, RunReport};
pub use error::{ClientError, SessionError};
pub use evaluator::evaluate;
pub use normalize::normalize_output;
pub use session::{Command, Effect, Session, SessionSnapshot};

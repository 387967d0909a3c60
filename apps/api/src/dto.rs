mod common;
mod rpc;

pub use common::{HealthDependencyStatus, HealthResponse, IdentityResponse};
pub use rpc::BatchResultResponse;

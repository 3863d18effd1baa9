pub mod findip;

use async_trait::async_trait;

use crate::domain::traffic::ResolutionResult;

pub use findip::FindIpClient;

/// One ISP lookup per IP address.
///
/// Implementations never fail: transport, status and decoding problems
/// come back as `ResolutionResult::Failed`.
#[async_trait]
pub trait IspLookup {
    async fn lookup(&self, ip: &str) -> ResolutionResult;
}

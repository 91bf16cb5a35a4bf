//! HTTP surface for ragvs: knowledge storage and listing, chat query and routed chat,
//! with bearer auth, per-IP rate limiting and CORS.

mod error;
mod handlers;
mod router;
mod server;

pub use error::GatewayError;
pub use server::{GatewayServer, SharedService};

//! Request/response types for the REST API.
//!
//! One module per dataset, mirroring the route modules. All types are
//! serde wire types; OpenAPI schemas derive behind the `openapi` feature.

pub mod air_quality;
pub mod covid;
pub mod elections;
pub mod housing;
pub mod weather;

pub use air_quality::*;
pub use covid::*;
pub use elections::*;
pub use housing::*;
pub use weather::*;

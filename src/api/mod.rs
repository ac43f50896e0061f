pub mod routes;

pub use routes::{api_router, not_found, public_router, ApiState};

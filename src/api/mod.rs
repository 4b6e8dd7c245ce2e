//! HTTP API
//! Mission: Route table and request handlers

pub mod records;
pub mod routes;
pub mod statistics;
pub mod timeentries;

pub use routes::{create_router, AppState};

use crate::auth::models::Principal;
use crate::error::ApiError;

/// Capability check for handlers on mixed-capability paths (where a
/// route-level admin layer cannot apply because other methods on the
/// same path are open to all authenticated principals).
pub(crate) fn require_admin_cap(principal: &Principal) -> Result<(), ApiError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Insufficient permissions"))
    }
}

//! Role-based access control extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use cinebook_core::error::CoreError;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";

/// Whether `role` may act on any customer's order.
pub fn is_staff_role(role: &str) -> bool {
    role == ROLE_STAFF || role == ROLE_ADMIN
}

/// Requires `staff` or `admin` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn refund(RequireStaff(user): RequireStaff) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireStaff(pub AuthUser);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !is_staff_role(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Staff or Admin role required".into(),
            )));
        }
        Ok(RequireStaff(user))
    }
}

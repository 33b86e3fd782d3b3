use std::sync::Arc;

use cinebook_core::booking::BookingService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Booking engine over the configured store.
    pub booking: Arc<BookingService>,
    pub config: Arc<ServerConfig>,
}

/// Admin service for queue, court and roster operations.
pub mod admin_service;
/// Board reads and open registration.
pub mod board_service;
/// Court clock ticker and degraded-mode relay.
pub mod clock_service;
/// Single-writer processor applying intents to the board.
pub mod command_processor;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor with backoff.
pub mod storage_supervisor;
/// Follows store pushes and reconciles them with the cache.
pub mod sync_service;

/// Typed repository over the board collections.
pub mod board;
/// Push-subscribe store abstraction and its backends.
pub mod board_store;
/// Wire models of the stored collections.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;

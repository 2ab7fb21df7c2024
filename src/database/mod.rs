// Database module for counsel-review
// Provides SQLite persistence for users, sessions, transcripts, and comments

pub mod comments_repo;
pub mod manager;
pub mod migrations;
pub mod models;
pub mod sessions_repo;
pub mod transcripts_repo;
pub mod users_repo;

pub use manager::DatabaseManager;
pub use models::*;

pub mod bridge;
pub mod sqlite;

pub mod cache;
pub mod changes;
pub mod db;

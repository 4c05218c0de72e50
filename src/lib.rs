pub mod db;
pub mod server;
pub mod storage;
pub mod types;

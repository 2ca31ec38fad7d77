pub mod conf;
pub mod discover;
pub mod fetch;

pub mod circuit;
pub mod cli;
pub mod conf;
pub mod discovery;
pub mod health;
pub mod logging;
pub mod registry;
pub mod router;
pub mod upstream;

mod jitter;
mod scorer;


pub use jitter::*;
pub use scorer::*;

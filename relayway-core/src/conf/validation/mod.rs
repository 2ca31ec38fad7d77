mod constraints;
mod validate;
mod validation_ctx;

pub use constraints::*;
pub use validate::*;
pub use validation_ctx::*;

pub mod product;
pub mod query;

pub use product::*;
pub use query::*;

//! Fish Audio API wire types

mod fish;
mod response;

pub use fish::*;
pub use response::*;

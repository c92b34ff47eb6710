pub mod extract;
pub mod flatten;
pub mod normalize;
pub mod parse;
pub mod reader;

pub use crate::domain::model::{ItemRecord, Row, Table, UserRecord};
pub use crate::domain::value::Value;
pub use crate::utils::error::Result;

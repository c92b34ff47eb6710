pub mod core;
pub mod domain;
pub mod utils;

pub use crate::core::extract::unique_column_values;
pub use crate::core::flatten::flatten_user;
pub use crate::core::normalize::{clean_text, normalize_text_column};
pub use crate::core::parse::parse_literal;
pub use crate::core::reader::RecordReader;
pub use crate::domain::model::{ItemRecord, Row, Table, UserRecord};
pub use crate::domain::value::Value;
pub use crate::utils::error::{PrepError, Result};

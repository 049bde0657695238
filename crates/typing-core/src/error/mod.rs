//! Domain errors

mod id_error;

pub use id_error::IdParseError;

pub mod aggregate;
pub mod cli;
pub mod convert;
pub mod emit;
pub mod error;
pub mod ignore;
pub mod model;
pub mod profile;
pub mod resolve;
pub mod scan;

pub use convert::Converter;
pub use error::{ConvertError, Result};
pub use ignore::Ignore;

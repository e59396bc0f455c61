pub mod file_format;
pub mod float_ext;
pub mod log_setup;
pub mod serde;

pub use file_format::{FileExtensionError, FileFormat, FileFormatResult};
pub use float_ext::FloatExt;
pub use crate::serde::{SerdeFormatError, SerdeFormatResult};

pub const EPSILON: f64 = 1e-6;

//! File type detection and the format registry

mod file_type;
pub(crate) mod registry;

pub use file_type::FileType;
pub use registry::extensions;

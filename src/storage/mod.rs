pub mod layout;
pub mod upload;

pub use layout::StorageLayout;
pub use upload::{PersistedUpload, Upload, sanitize_file_name};

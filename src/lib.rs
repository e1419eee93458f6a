pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

pub use error::UploadError;
pub use models::StoredFile;
pub use services::uploader::{LookupMode, Uploader, UploaderConfig};
pub use utils::slug::{AsciiSlugger, Slugger};
pub use utils::upload_file::{UploadForm, UploadedFile};

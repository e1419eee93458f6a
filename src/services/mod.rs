pub mod digest;
pub mod digest_index;
pub mod uploader;

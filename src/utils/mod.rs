pub mod slug;
pub mod sniff;
pub mod upload_file;

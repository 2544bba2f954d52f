mod services;

pub use services::{MediaUploader, PendingFile};

pub mod services;

pub use services::{
    is_supported_image, presign_many, remove_photos, resolve_photo, upload_analysis_photos, ResolvedPhoto,
    UploadItem,
};

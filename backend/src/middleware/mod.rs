pub mod auth;

pub use auth::{upload_auth_middleware, UploadAuth};

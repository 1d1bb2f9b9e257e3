pub mod url_validation;
pub use url_validation::{MEDIA_SOCKET_PATH, UrlValidationError, media_socket_url};

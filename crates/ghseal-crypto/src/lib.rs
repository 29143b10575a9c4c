mod error;
mod seal;

pub use error::SealError;
pub use seal::{require_string_argument, Encrypt, PUBLIC_KEY_LEN};

//! Board snapshot persistence, image upload storage, and the credential
//! store — the Persistence Port and Image Upload Port the session layer
//! consumes (`spec.md` §4.7, §4.8).

#![forbid(unsafe_code)]

pub mod boards;
pub mod credentials;
pub mod error;
pub mod images;
pub mod paths;
pub mod timelapse;

pub use boards::BoardStore;
pub use credentials::CredentialStore;
pub use error::StoreError;
pub use images::ImageStore;
pub use paths::StoreLayout;
pub use timelapse::TimelapseStore;

pub type Result<T> = std::result::Result<T, StoreError>;

mod backend;
mod secret;
pub mod uri;

pub use backend::Backend;
pub use secret::Secret;
pub use uri::ConnectionUri;

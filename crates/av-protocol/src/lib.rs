pub mod error;
pub mod field;
pub mod frame;
pub mod record;
pub mod session;
pub mod topics;

pub use error::*;
pub use field::*;
pub use frame::*;
pub use record::*;
pub use session::*;

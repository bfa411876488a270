pub mod error;
pub mod record;
pub mod settings;

pub use error::*;
pub use record::*;
pub use settings::*;

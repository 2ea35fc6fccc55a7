pub mod config_manager;
pub mod error;
pub mod message;
pub mod record;
pub mod schema;

pub use config_manager::*;
pub use error::*;
pub use message::*;
pub use record::*;
pub use schema::*;

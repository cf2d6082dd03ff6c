pub mod config;
pub mod error;
pub mod filter;
pub mod insight;
pub mod metadata;
pub mod source;
pub mod stats;
pub mod upload;
pub mod visualization;

pub use config::Config;
pub use error::*;
pub use filter::*;
pub use insight::*;
pub use metadata::*;
pub use source::*;
pub use stats::*;
pub use upload::*;
pub use visualization::*;

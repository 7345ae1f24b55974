mod adapter;
mod cast;
mod connection;
mod criteria;
mod driver;
mod error;
mod executor;
mod query;
mod record;
mod registry;
mod schema;
mod util;
mod value;
mod writer;

pub use ::anyhow::Context as ErrorContext;
pub use adapter::*;
pub use cast::*;
pub use connection::*;
pub use criteria::*;
pub use driver::*;
pub use error::*;
pub use executor::*;
pub use query::*;
pub use record::*;
pub use registry::*;
pub use schema::*;
pub use util::*;
pub use value::*;
pub use writer::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;

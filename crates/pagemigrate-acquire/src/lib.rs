//! Everything that touches the outside world for a migration run: input
//! tables, page fetches, and the output tables and logs.

pub mod fetch;
pub mod output;
pub mod rows;

pub use fetch::{Fetch, HttpFetcher};
pub use output::{FailureLog, RecordSink, StatusSink};
pub use rows::{KeyCase, LookupTable, Table};

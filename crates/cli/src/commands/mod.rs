//! Command handlers for the DeepSearch CLI.

pub mod load;
pub mod query;
pub mod retrieve;
pub mod serve;
pub mod stats;

pub use load::LoadCommand;
pub use query::QueryCommand;
pub use retrieve::RetrieveCommand;
pub use serve::ServeCommand;
pub use stats::StatsCommand;

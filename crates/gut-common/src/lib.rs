pub mod analysis;
pub mod citation;
pub mod error;
pub mod location;
pub mod mock;
pub mod model;
pub mod query_input;
pub mod results;

pub mod chunk;
pub mod columns;
pub mod date;
pub mod load;
pub mod record;

pub use columns::Projection;
pub use load::{load, LoadOptions};
pub use record::ServiceRequest;

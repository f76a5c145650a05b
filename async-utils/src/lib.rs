mod coalesce;
mod timeout;

pub use coalesce::Abandoned;
pub use coalesce::Coalescer;
pub use timeout::OrTimeoutExt;
pub use timeout::TimedOut;

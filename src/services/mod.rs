pub mod sink;
pub mod watchlist;

pub use sink::{dispatch, EventSink, HttpEventSink};
pub use watchlist::{HttpWatchlistSource, WatchlistSource};

pub mod address;
pub mod cursor;
pub mod transaction;
pub mod units;
pub mod watchlist;

pub use address::Address;
pub use cursor::Cursor;
pub use transaction::{Block, DecodedEvent, Transaction};
pub use units::{scale_be_bytes, scale_u128, scale_u256, Amount};
pub use watchlist::WatchlistSnapshot;

pub mod listing;
pub mod locality;
pub mod logic;
pub mod market;

pub use listing::{AuctionRound, Field, Listing, RawExtraction};
pub use locality::parse_locality;
pub use market::{Confidence, MarketEstimate, MarketSample};

mod parse;
mod selectors;

pub use parse::{parse_area, parse_count, parse_percent, parse_price};
pub use selectors::{clean_text, CardLocator, FallbackChain, StrategySpec};
pub(crate) use selectors::compile_selector;

mod utils;

mod consolidate_tests;
mod market_tests;
mod orchestrator_tests;
mod session_tests;

mod browser;
mod http;
mod identity;
mod manager;
mod rate_limiter;
mod webdriver;

pub use browser::{Browser, BrowserLauncher, LaunchOptions};
pub use http::{HttpLauncher, ZenRowsProxy};
pub(crate) use http::{document_title, find_href};
pub use identity::{Identity, IdentityPool};
pub use manager::{Session, SessionManager};
pub use rate_limiter::RateLimiter;
pub use webdriver::WebDriverLauncher;

mod automation;
mod cookies;
mod error;
mod human;

pub use automation::{BrowserAutomation, BrowserLauncher, BrowserSession, ViewportSpec};
pub use cookies::SessionCookies;
pub use error::{BrowserError, BrowserResult};
pub use human::HumanPacing;

//! # Page Model
//!
//! The page capabilities the site shell is built on. This crate holds page
//! state only (elements, cookies, window globals, ready state) and contains
//! no orchestration logic.
//!
//! ## Core Components
//!
//! - **dom**: `ElementAccess` and the headless `Document`
//! - **cookies**: `CookieJar`, `SetCookie` and the headless `MemoryCookieJar`
//! - **window**: `ScriptHost` and the headless `Window`
//! - **lifecycle**: `document.readyState` as an awaitable value
//! - **config**: `SiteConfig`, loaded from TOML

pub mod config;
pub mod cookies;
pub mod dom;
pub mod error;
pub mod lifecycle;
pub mod location;
pub mod page;
pub mod window;

pub use config::*;
pub use cookies::*;
pub use dom::*;
pub use error::*;
pub use lifecycle::*;
pub use location::*;
pub use page::*;
pub use window::*;

//! # Site Core
//!
//! Behavior shared by every page of the site: shared fragments are loaded
//! into their containers, readiness is announced to dependents, and
//! third-party analytics is gated behind a stored consent decision.
//!
//! ## Core Components
//!
//! - **fragments**: concurrent fragment loading and the single-fire `ReadinessSignal`
//! - **consent**: the consent state machine, its cookie store and the analytics loader
//! - **navigation**: marks the current page in the navigation once it is present
//! - **shell**: `SiteShell`, the bootstrap that runs all of the above for one page
//!
//! Page state lives in `page_model`; this crate only orchestrates it through
//! the capability traits defined there.

pub mod consent;
pub mod error;
pub mod fragments;
pub mod navigation;
pub mod shell;

pub use consent::*;
pub use error::*;
pub use fragments::*;
pub use navigation::*;
pub use shell::*;

//! Browser automation surface for login orchestration.
//!
//! Exposes the [`Surface`] capability the login flow drives, plus the
//! Chromium-backed implementation used in production. Tests substitute
//! their own `Surface`.

pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod surface;

pub use engine::{ChromiumFactory, ChromiumSurface};
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
pub use surface::{Locator, Surface, SurfaceFactory};

//! Workspace facade crate.
//!
//! Re-exports the public surface of the individual workspace crates so host
//! applications can depend on `cloud-sdk` alone. The `desktop` feature (on by
//! default) pulls in the reqwest transport and the thread-backed callback
//! executor from `bridge-desktop`.

pub use bridge_traits as bridge;
pub use core_auth as auth;
pub use core_call as call;
pub use core_runtime as runtime;
pub use provider_pcloud as pcloud;

#[cfg(feature = "desktop")]
pub use bridge_desktop as desktop;

pub use core_call::{BoxCall, Call, CallError, Callback, ProgressListener};
pub use provider_pcloud::{PCloudClient, PCloudClientBuilder};

//! Advisory platform information
//!
//! Display-only: nothing in the update path branches on this.

/// One-line OS/arch description for run headers.
pub fn describe() -> String {
    format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH)
}

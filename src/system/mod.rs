//! # System Interaction Layer
//!
//! The boundary between Ellie and the operating system.
//!
//! - **`executor`**: spawns external programs (`git`, `ellie run ...`) with the
//!   terminal attached, and kills them when the shared cancellation token flips.

pub mod executor;

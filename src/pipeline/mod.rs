//! Pipeline stages for per-page text removal.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap
//! implementations (e.g. a different synthesis backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! recognize ──▶ consolidate ──▶ mask ──▶ reconstruct
//! (detect      (merge + pad    (local    (external
//!  blocks)      regions)        fills)    inpainting)
//! ```
//!
//! 1. [`recognize`]   — drive the recognition capability and validate its
//!    loosely-shaped output into text blocks in reading order
//! 2. [`consolidate`] — turn removable blocks into a minimal set of padded
//!    cleanup regions
//! 3. [`mask`]        — paint approximate backgrounds over the regions as a
//!    deterministic pre-conditioning step
//! 4. [`reconstruct`] — ask the synthesis capability to seamlessly restore
//!    the background inside the regions
//! 5. [`encode`]      — PNG-encode images for the capability request bodies
//!
//! The state machine sequencing these stages lives in [`crate::run`].

pub mod consolidate;
pub mod encode;
pub mod mask;
pub mod recognize;
pub mod reconstruct;

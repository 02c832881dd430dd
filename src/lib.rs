// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Deferred 3D rendering pipeline built on wgpu.
//!
//! Scene geometry is rasterized into a GBuffer (color, packed normal,
//! depth), queued lights are accumulated against it with one full-screen
//! pass per directional light and one sphere volume per point light, and
//! the lit image is composited through optional FXAA and bloom into a
//! final target that layers over the output surface.
//!
//! # Key entry points
//!
//! - [`renderer::Renderer`] - owns every stage and drives the frame
//! - [`scene::Scene`] - the caller's camera, entity transforms and geometry
//! - [`submission`] - per-frame light and billboard queues
//! - [`options::Options`] - post-processing, debug and frame setup
//!
//! # Frame
//!
//! `update` → `submit_light` / `submit_billboard` → `draw` → `present`.
//! [`renderer::FramePhase`] tracks the position within the frame and
//! out-of-order calls return [`error::DeferredError::FrameOrder`].

pub mod error;
pub mod gpu;
pub mod options;
pub mod renderer;
pub mod scene;
pub mod submission;
#[cfg(feature = "viewer")]
pub mod viewer;

pub use error::DeferredError;
pub use renderer::Renderer;

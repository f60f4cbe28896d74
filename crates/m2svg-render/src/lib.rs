//! # m2svg rendering
//!
//! Everything between a matched math span and the markup that replaces it:
//!
//! - [`cache`]: fingerprints equations and assigns artifact identifiers,
//!   so each distinct equation is rendered once per run.
//! - [`store`]: writes artifacts to disk, once each.
//! - [`renderer`]: the [`Renderer`] trait and the MathJax command-line backend.
//! - [`svg`]: post-processing of rendered SVG.
//! - [`markup`]: placeholder markup and the `nowrap` pass.
//! - [`reverse()`]: turns a converted document back into TeX.

pub mod cache;
pub mod markup;
pub mod renderer;
pub mod reverse;
pub mod store;
pub mod svg;

pub use cache::{ArtifactId, CacheEntry, Fingerprint, Lookup, NamingPolicy, RenderCache};
pub use markup::OutputMode;
pub use renderer::{CommandRenderer, OutputFormat, RenderError, Renderer, Rendering};
pub use reverse::reverse;
pub use store::ArtifactStore;
pub use svg::Metrics;

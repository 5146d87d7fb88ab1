//! Error taxonomy (§7).
//!
//! Only the "fail loudly at `.build()`" kind is `Result`-shaped — everything else in the
//! spec's taxonomy (out-of-range index, adapter failure, template exception, handler
//! exception) is a runtime policy, not a propagated error, and is implemented as such
//! elsewhere (silent no-op/clamp, an `error` event, or a caught-and-logged default).

use thiserror::Error;

/// Raised by [`crate::builder::Builder::build`] when the configuration cannot produce a
/// working instance. Construction never partially succeeds: either `build()` returns an
/// instance or none of its side effects (DOM nodes, observers, listeners) happened.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("container element not found for selector `{0}`")]
    ContainerNotFound(String),

    #[error("item.template is required")]
    MissingTemplate,

    #[error(
        "item.height/width or item.estimatedHeight/estimatedWidth must be set for {0} orientation"
    )]
    MissingSize(&'static str),

    #[error("feature `{0}` conflicts with feature `{1}`")]
    FeatureConflict(String, String),

    #[error("horizontal orientation is incompatible with {0}")]
    HorizontalIncompatible(&'static str),

    #[error("{0} requires {1}, which this environment does not provide")]
    MissingEnvironmentApi(&'static str, &'static str),
}

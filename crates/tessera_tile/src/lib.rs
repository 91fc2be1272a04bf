//! Tile - Per-file CSS Modules transform for Tessera.
//!
//! Turns raw CSS text into scoped CSS plus an ordered export map and the
//! cross-file references the resolver must fill in.
//!
//! # Backends
//!
//! - [`IcssTransformer`]: five-stage ICSS pipeline over a lightweight CSS tree
//! - [`LightningTransformer`]: LightningCSS `css_modules` (feature `native`)
//!
//! Both return the same [`TransformOutput`] shape, so callers stay
//! backend-agnostic.
//!
//! # Example
//!
//! ```
//! use tessera_tile::{IcssTransformer, ModuleOptions, Transformer};
//!
//! let options = ModuleOptions {
//!     generate_scoped_name: Some("[name]_[local]".into()),
//!     ..Default::default()
//! };
//! let out = IcssTransformer
//!     .transform(".title { color: red }", "card.css", &options, false)
//!     .unwrap();
//! assert_eq!(out.exports["title"].name(), "card_title");
//! assert!(out.code.contains(".card_title"));
//! ```

pub mod error;
pub mod icss;
#[cfg(feature = "native")]
pub mod lightning;
pub mod locate;
pub mod options;
pub mod pipeline;
pub mod scoped_name;
pub mod syntax;
pub mod types;

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use error::{TransformError, TransformResult};
#[cfg(feature = "native")]
pub use lightning::LightningTransformer;
pub use options::{ModuleOptions, ScopeBehaviour, ScopedNameFn, ScopedNameGenerator};
pub use pipeline::IcssTransformer;
pub use types::{
    ComposedRef, CssModuleExports, CssModuleReferences, DependencyReference, ExportEntry,
    Extracted, TransformOutput,
};

/// A CSS modules engine.
///
/// `id` seeds scoped name hashing and is the base for relative specifiers,
/// so it must be stable across builds of unchanged input.
pub trait Transformer: Send + Sync {
    /// Backend name used in logs and errors.
    fn name(&self) -> &'static str;

    fn transform(
        &self,
        code: &str,
        id: &str,
        options: &ModuleOptions,
        source_map: bool,
    ) -> TransformResult<TransformOutput>;
}

/// Selectable transformer backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Icss,
    Lightningcss,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Icss => "icss",
            Backend::Lightningcss => "lightningcss",
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "icss" | "postcss" => Ok(Backend::Icss),
            "lightningcss" => Ok(Backend::Lightningcss),
            other => Err(format!("unknown backend \"{other}\" (expected icss or lightningcss)")),
        }
    }
}

/// Instantiate the transformer for `backend`.
pub fn transformer_for(backend: Backend) -> TransformResult<Arc<dyn Transformer>> {
    match backend {
        Backend::Icss => Ok(Arc::new(IcssTransformer)),
        #[cfg(feature = "native")]
        Backend::Lightningcss => Ok(Arc::new(LightningTransformer)),
        #[cfg(not(feature = "native"))]
        Backend::Lightningcss => Err(TransformError::Unsupported {
            backend: "lightningcss",
            message: "tessera_tile was built without the `native` feature".to_string(),
        }),
    }
}

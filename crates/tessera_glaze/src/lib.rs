//! Glaze - The finish applied to every Tessera module.
//!
//! Turns a resolved export map into the artifacts consumers import:
//!
//! - **synth**: the ESM binding module (`import`s, `const` bindings, named
//!   and/or default exports)
//! - **dts**: the matching TypeScript declaration text, optionally with an
//!   inline source map back to the CSS selectors
//!
//! Both generators are pure functions of their input, so regenerating for
//! unchanged input is byte-identical.

pub mod dts;
pub mod model;
pub mod naming;
pub mod synth;

pub use dts::{generate_types, DeclarationMap, HEADER as DTS_HEADER};
pub use model::{BindingId, ClassExpr, Exports, ImportBinding, Imports, ResolvedExport, Segment};
pub use naming::{ExportMode, LocalsConvention, LocalsConventionFn, Target};
pub use synth::{synthesize, SynthOutput};

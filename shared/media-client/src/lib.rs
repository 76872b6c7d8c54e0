//! Client-side resolution of stored media references.
//!
//! [`SignedUrlResolver`] turns the reference held by a UI component into a
//! render-ready URL plus loading and error flags, going through the site's
//! `/api/download` endpoint when the reference is a storage key.

mod error;
mod resolver;
mod source;

pub use error::{ResolveError, ResolveResult};
pub use resolver::{ResolutionState, ResolutionWatcher, SignedUrlResolver};
pub use source::{HttpSignedUrlSource, SignedUrlSource};

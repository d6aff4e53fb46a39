//! HTML include expansion: elements marked `data-include="path"` get the
//! referenced fragment fetched, its markup injected, and its scripts
//! activated in source order.

pub mod constants;
pub mod dom;
pub mod error;
pub mod fetch;
pub mod models;
pub mod resolver;
pub mod script;

pub use dom::{Document, ElementData, NodeData, NodeId};
pub use error::{FetchError, IncludeError, ScriptError};
pub use fetch::{FragmentFetcher, HttpFetcher};
pub use models::{HostOutcome, ResolveReport, ResolverConfig};
pub use resolver::{IncludeResolver, SharedDocument};
pub use script::{
    FetchScriptRuntime, InertScriptRuntime, ScriptDescriptor, ScriptRuntime, ScriptSource,
};

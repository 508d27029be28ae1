//! Plexus Resolver - class, resource and native library resolution across a
//! graph of plugins.
//!
//! Every plugin declares code and resource libraries, the names each library
//! exports, and its prerequisites (optionally re-exported to its own
//! importers). This crate answers, for one plugin at a time:
//!
//! - which plugins it may see at all ([`accessible_imports`])
//! - which artifact a class name resolves to ([`Resolver::resolve`])
//! - which resources match a path ([`Resolver::find_one`], [`Resolver::find_all`])
//! - where a native library can be loaded from ([`Resolver::locate_native`])
//!
//! Everything the host owns (descriptors, activation state, path mapping, its
//! own module loader) is reached through the traits in [`Collaborators`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use plexus_resolver::{Collaborators, NoRootResolver, PluginId, ResolverRuntime, ResolverSettings};
//!
//! # fn demo(
//! #     registry: Arc<dyn plexus_resolver::Registry>,
//! #     activation: Arc<dyn plexus_resolver::ActivationOracle>,
//! #     paths: Arc<dyn plexus_resolver::PathResolver>,
//! # ) -> Result<(), plexus_resolver::ResolveError> {
//! let runtime = ResolverRuntime::new(
//!     ResolverSettings::default(),
//!     Collaborators::new(registry, activation, paths, Arc::new(NoRootResolver)),
//! );
//! let resolver = runtime.resolver(&PluginId::new("org.sample.app")?)?;
//! let widget = resolver.resolve("com.acme.Widget")?;
//! println!("{} bytes from {:?}", widget.bytes().len(), widget.owner());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Name and namespace helpers.
pub mod namespace;

mod artifact;
mod cache_root;
mod collaborators;
mod descriptor;
mod error;
mod imports;
mod locality;
mod location;
mod native;
mod resolver;
mod runtime;
mod settings;
mod source;
mod visibility;

pub use artifact::{Artifact, Resource};
pub use collaborators::{
    ActivationOracle, Collaborators, DynamicResolver, LibraryReader, NoRootResolver,
    PathResolver, Registry, RootResolver, SourceOpener,
};
pub use descriptor::{Library, LibraryKind, PluginDescriptor, PluginId, Prerequisite};
pub use error::{ResolveError, ResolveResult};
pub use imports::{ImportSnapshot, accessible_imports};
pub use locality::{LocalNamespaces, NamespaceOwners};
pub use location::Location;
pub use native::platform_library_name;
pub use runtime::{Resolver, ResolverRuntime};
pub use settings::{NativeCacheSettings, ResolverSettings};
pub use source::{DefaultOpener, FsLibraryReader};
pub use visibility::{PUBLIC_EXPORT, VisibilityFilter};

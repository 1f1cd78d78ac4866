//! Route resolution.
//!
//! A [`RouteTable`] is compiled once from [`RouteDescriptor`]s and shared by
//! every request. Each request owns a [`Router`] that records the navigation
//! target with [`Router::push`] and resolves it with [`Router::ready`], which
//! settles every lazily loaded component on the matched branch before
//! returning the [`ComponentChain`].
//!
//! ## Pattern syntax
//!
//! - static segments: `/about`
//! - named parameters matching one segment: `/users/{id}`
//! - a trailing catch-all: `/docs/{*rest}`
//!
//! Nested descriptors inherit their parent's path unless they start with `/`.

mod core;
mod lazy;
mod pattern;

use std::collections::HashMap;

/// Path parameters extracted from a matched route.
pub type RouteParams = HashMap<String, String>;

pub use self::core::{
	ComponentChain, Location, ResolveError, RouteDefinitionError, RouteDescriptor, RouteTable,
	Router, RouterError,
};
pub use lazy::{ComponentFuture, ComponentRef, LazyComponent};
pub use pattern::{PathPattern, PatternError};

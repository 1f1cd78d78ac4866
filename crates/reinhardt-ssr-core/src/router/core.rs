//! Route table, per-request router and matched component chains.

use super::RouteParams;
use super::lazy::ComponentRef;
use super::pattern::{PathPattern, PatternError, join_paths};
use crate::component::{BoxError, Component};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Error raised while resolving a URL to a component chain.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
	/// [`Router::ready`] was awaited without a preceding [`Router::push`].
	#[error("no navigation is pending")]
	NoNavigation,

	/// A lazily loaded component failed to load.
	#[error("failed to load module `{module}`: {source}")]
	LazyLoad {
		/// Declared module identifier.
		module: String,
		/// Loader failure.
		#[source]
		source: BoxError,
	},

	/// A lazy loader produced a component from a different module.
	#[error("lazy module `{expected}` resolved to component of module `{found}`")]
	ModuleMismatch {
		/// Declared module identifier.
		expected: String,
		/// Module identifier of the loaded component.
		found: String,
	},
}

/// Error raised when reversing a named route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
	/// No route carries the given name.
	#[error("Invalid route name: {0}")]
	InvalidRouteName(String),
	/// A placeholder had no value.
	#[error("Missing parameter: {0}")]
	MissingParameter(String),
}

/// Error raised while compiling a route table.
#[derive(Debug, thiserror::Error)]
pub enum RouteDefinitionError {
	/// A route pattern is invalid.
	#[error(transparent)]
	Pattern(#[from] PatternError),
	/// Two routes share a name.
	#[error("duplicate route name: {0}")]
	DuplicateName(String),
}

/// Declarative description of one route and its nested children.
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
	path: String,
	name: Option<String>,
	component: ComponentRef,
	children: Vec<RouteDescriptor>,
}

impl RouteDescriptor {
	/// Creates a route for the given path.
	pub fn new(path: impl Into<String>, component: ComponentRef) -> Self {
		Self {
			path: path.into(),
			name: None,
			component,
			children: Vec::new(),
		}
	}

	/// Names the route for reverse lookup.
	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Adds a nested route.
	pub fn child(mut self, child: RouteDescriptor) -> Self {
		self.children.push(child);
		self
	}

	/// Adds several nested routes.
	pub fn children(mut self, children: impl IntoIterator<Item = RouteDescriptor>) -> Self {
		self.children.extend(children);
		self
	}

	/// The declared (possibly relative) path.
	pub fn path(&self) -> &str {
		&self.path
	}
}

#[derive(Debug)]
struct RouteNode {
	pattern: PathPattern,
	name: Option<String>,
	component: ComponentRef,
	children: Vec<RouteNode>,
}

impl RouteNode {
	fn compile(
		descriptor: RouteDescriptor,
		parent: &str,
		named: &mut HashMap<String, PathPattern>,
	) -> Result<Self, RouteDefinitionError> {
		let full_path = if parent.is_empty() {
			descriptor.path.clone()
		} else {
			join_paths(parent, &descriptor.path)
		};
		let pattern = PathPattern::parse(&full_path)?;

		if let Some(name) = &descriptor.name {
			if named.contains_key(name) {
				return Err(RouteDefinitionError::DuplicateName(name.clone()));
			}
			named.insert(name.clone(), pattern.clone());
		}

		let children = descriptor
			.children
			.into_iter()
			.map(|child| Self::compile(child, &full_path, named))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self {
			pattern,
			name: descriptor.name,
			component: descriptor.component,
			children,
		})
	}
}

/// Immutable, shareable route table.
///
/// Matching is depth first in registration order: a route's children are
/// tried before the route itself and the first match wins.
#[derive(Debug)]
pub struct RouteTable {
	routes: Vec<RouteNode>,
	named: HashMap<String, PathPattern>,
}

impl RouteTable {
	/// Compiles a route table.
	pub fn new(
		descriptors: impl IntoIterator<Item = RouteDescriptor>,
	) -> Result<Self, RouteDefinitionError> {
		let mut named = HashMap::new();
		let routes = descriptors
			.into_iter()
			.map(|descriptor| RouteNode::compile(descriptor, "", &mut named))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self { routes, named })
	}

	/// Number of routes, nested routes included.
	pub fn route_count(&self) -> usize {
		fn count(nodes: &[RouteNode]) -> usize {
			nodes.iter().map(|node| 1 + count(&node.children)).sum()
		}
		count(&self.routes)
	}

	/// Returns true if a route with the given name exists.
	pub fn has_route(&self, name: &str) -> bool {
		self.named.contains_key(name)
	}

	/// Module identifiers of every route component, in registration order.
	pub fn module_ids(&self) -> Vec<String> {
		fn collect(nodes: &[RouteNode], out: &mut Vec<String>) {
			for node in nodes {
				let id = node.component.module_id();
				if !out.iter().any(|existing| existing == id) {
					out.push(id.to_string());
				}
				collect(&node.children, out);
			}
		}
		let mut ids = Vec::new();
		collect(&self.routes, &mut ids);
		ids
	}

	/// Builds the path of a named route.
	pub fn reverse(&self, name: &str, params: &[(&str, &str)]) -> Result<String, RouterError> {
		let pattern = self
			.named
			.get(name)
			.ok_or_else(|| RouterError::InvalidRouteName(name.to_string()))?;

		let params: HashMap<String, String> = params
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();

		pattern.reverse(&params)
	}

	/// Resolves a URL to its component chain, loading lazy components.
	///
	/// An unmatched URL yields an empty chain rather than an error.
	pub async fn resolve(&self, url: &str) -> Result<ComponentChain, ResolveError> {
		let location = Location::parse(url);
		let mut trail = Vec::new();

		let Some(params) = match_nodes(&self.routes, location.path(), &mut trail) else {
			tracing::debug!(path = %location.path(), "No route matched");
			return Ok(ComponentChain::unmatched(location));
		};

		let components =
			futures::future::try_join_all(trail.iter().map(|node| node.component.resolve()))
				.await?;
		let route_name = trail.last().and_then(|node| node.name.clone());

		tracing::debug!(
			path = %location.path(),
			depth = components.len(),
			"Route resolved"
		);

		Ok(ComponentChain {
			components,
			params,
			route_name,
			location,
		})
	}
}

fn match_nodes<'a>(
	nodes: &'a [RouteNode],
	path: &str,
	trail: &mut Vec<&'a RouteNode>,
) -> Option<RouteParams> {
	for node in nodes {
		trail.push(node);
		if let Some(params) = match_nodes(&node.children, path, trail) {
			return Some(params);
		}
		if let Some(params) = node.pattern.matches(path) {
			return Some(params);
		}
		trail.pop();
	}
	None
}

/// A request URL split into path and query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
	path: String,
	query: HashMap<String, String>,
}

impl Location {
	/// Parses a request target or absolute URL.
	///
	/// The fragment is discarded and the query is split off before the
	/// origin of an absolute URL is stripped, so URLs inside query values
	/// never affect the path. Percent-encoded unreserved characters in the
	/// path are decoded; other escapes are kept for parameter decoding. An
	/// empty path becomes `/`; a malformed query string is ignored.
	pub fn parse(url: &str) -> Self {
		let url = url.split_once('#').map_or(url, |(before, _)| before);
		let (target, query) = url.split_once('?').unwrap_or((url, ""));
		let path = decode_unreserved(strip_origin(target));

		let query = if query.is_empty() {
			HashMap::new()
		} else {
			serde_urlencoded::from_str::<Vec<(String, String)>>(query)
				.map(|pairs| pairs.into_iter().collect())
				.unwrap_or_else(|err| {
					tracing::debug!(error = %err, "Ignoring malformed query string");
					HashMap::new()
				})
		};

		Self {
			path: if path.is_empty() {
				"/".to_string()
			} else {
				path
			},
			query,
		}
	}

	/// The path component.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Decoded query parameters.
	pub fn query(&self) -> &HashMap<String, String> {
		&self.query
	}
}

/// Drops `scheme://authority` from an absolute URL.
fn strip_origin(target: &str) -> &str {
	match target.split_once("://") {
		Some((scheme, rest)) if is_scheme(scheme) => rest.find('/').map_or("/", |at| &rest[at..]),
		_ => target,
	}
}

/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`
fn is_scheme(candidate: &str) -> bool {
	let mut chars = candidate.chars();
	matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
		&& chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Decodes `%XX` escapes of unreserved characters, leaving every other
/// escape (such as `%2F`) untouched.
fn decode_unreserved(path: &str) -> String {
	let mut decoded = String::with_capacity(path.len());
	let mut rest = path;

	while let Some(at) = rest.find('%') {
		decoded.push_str(&rest[..at]);
		let byte = rest
			.get(at + 1..at + 3)
			.filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
			.and_then(|hex| u8::from_str_radix(hex, 16).ok());

		match byte {
			Some(b) if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') => {
				decoded.push(char::from(b));
				rest = &rest[at + 3..];
			}
			_ => {
				decoded.push('%');
				rest = &rest[at + 1..];
			}
		}
	}

	decoded.push_str(rest);
	decoded
}

/// Components matched for a URL, ordered from outermost to innermost.
#[derive(Clone)]
pub struct ComponentChain {
	components: Vec<Arc<dyn Component>>,
	params: RouteParams,
	route_name: Option<String>,
	location: Location,
}

impl fmt::Debug for ComponentChain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentChain")
			.field("components", &self.module_ids())
			.field("params", &self.params)
			.field("route_name", &self.route_name)
			.field("location", &self.location)
			.finish()
	}
}

impl ComponentChain {
	fn unmatched(location: Location) -> Self {
		Self {
			components: Vec::new(),
			params: RouteParams::new(),
			route_name: None,
			location,
		}
	}

	/// Returns true when no route matched.
	pub fn is_empty(&self) -> bool {
		self.components.is_empty()
	}

	/// Number of matched components.
	pub fn len(&self) -> usize {
		self.components.len()
	}

	/// Iterates components from outermost to innermost.
	pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<dyn Component>> {
		self.components.iter()
	}

	/// Path parameters of the match.
	pub fn params(&self) -> &RouteParams {
		&self.params
	}

	/// Name of the innermost matched route, if it has one.
	pub fn route_name(&self) -> Option<&str> {
		self.route_name.as_deref()
	}

	/// The parsed request location.
	pub fn location(&self) -> &Location {
		&self.location
	}

	/// The request path.
	pub fn path(&self) -> &str {
		self.location.path()
	}

	/// Query parameters.
	pub fn query(&self) -> &HashMap<String, String> {
		self.location.query()
	}

	/// Module identifiers of the matched components.
	pub fn module_ids(&self) -> Vec<&str> {
		self.components.iter().map(|c| c.module_id()).collect()
	}
}

/// Per-request navigation handle.
#[derive(Debug, Clone)]
pub struct Router {
	table: Arc<RouteTable>,
	pending: Option<String>,
	current: Option<ComponentChain>,
}

impl Router {
	/// Creates a router over a shared route table.
	pub fn new(table: Arc<RouteTable>) -> Self {
		Self {
			table,
			pending: None,
			current: None,
		}
	}

	/// Records the navigation target. Resolution happens in [`Router::ready`].
	pub fn push(&mut self, url: impl Into<String>) {
		self.pending = Some(url.into());
	}

	/// Resolves the pending navigation.
	///
	/// Completes only once every lazy component on the matched branch has
	/// loaded. The result is also kept as [`Router::current`].
	pub async fn ready(&mut self) -> Result<ComponentChain, ResolveError> {
		let url = self.pending.take().ok_or(ResolveError::NoNavigation)?;
		let chain = self.table.resolve(&url).await?;
		self.current = Some(chain.clone());
		Ok(chain)
	}

	/// Pushes `url` and waits for it to resolve.
	pub async fn resolve(&mut self, url: impl Into<String>) -> Result<ComponentChain, ResolveError> {
		self.push(url);
		self.ready().await
	}

	/// The most recently resolved chain.
	pub fn current(&self) -> Option<&ComponentChain> {
		self.current.as_ref()
	}

	/// The shared route table.
	pub fn table(&self) -> &Arc<RouteTable> {
		&self.table
	}

	/// Builds the path of a named route.
	pub fn reverse(&self, name: &str, params: &[(&str, &str)]) -> Result<String, RouterError> {
		self.table.reverse(name, params)
	}
}

//! Prefix tree for HTTP route matching
//!
//! Routes are split into `/`-separated segments and stored in a tree where:
//! - Literal segments (e.g. `tracks`) match exactly
//! - Parameter segments (e.g. `:id`) match any single segment
//! - A wildcard segment (e.g. `*rest`) flags the owning node; matching stops
//!   there and the whole request path is bound under the key `path`
//! - Method tables ([`RouteEntry`]) live on terminal nodes
//!
//! Nodes are kept in an arena (`Vec<TrieNode>`) and refer to their children
//! by index. The tree is add-only and is never mutated once the server is
//! built, so lookups need no synchronisation.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use sprig::router::RouteTrie;
//!
//! let mut trie = RouteTrie::new();
//! trie.add_route("tracks/:slug/artist/:id").set(Method::GET, "get_artist");
//!
//! let matched = trie.match_path("/tracks/song-title/artist/100");
//! assert_eq!(matched.params.get("slug"), Some("song-title"));
//! assert_eq!(matched.params.get("id"), Some("100"));
//! ```
//!
//! Matching is O(k) in the number of path segments with no backtracking: a
//! literal child always wins over the parameter child, and a failed descent is
//! a miss.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::core::{ParamVec, Params, RouteEntry, RouteMatch};

/// Index of a node in the trie arena
type NodeId = usize;

const ROOT: NodeId = 0;

/// Fixed key under which a wildcard match binds the request path.
pub const WILDCARD_KEY: &str = "path";

/// One token of a route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Key(&'a str),
    Wildcard(&'a str),
}

/// Split a route or request path into segments.
///
/// Removes a single `/` from the beginning and the end, then splits on `/`.
/// Empty inner segments are kept, so `/` yields one empty segment.
fn path_parts(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    trimmed.split('/')
}

fn tokenize(pattern: &str) -> impl Iterator<Item = Token<'_>> {
    path_parts(pattern).map(|part| {
        if let Some(key) = part.strip_prefix(':') {
            Token::Key(key)
        } else if let Some(name) = part.strip_prefix('*') {
            Token::Wildcard(name)
        } else {
            Token::Text(part)
        }
    })
}

/// Node in the prefix tree
#[derive(Debug)]
struct TrieNode<T> {
    /// Literal children keyed by exact segment text
    literals: HashMap<String, NodeId>,
    /// The single parameter child shared by every `:name` at this position
    param_child: Option<NodeId>,
    /// Most recently registered parameter name at this position
    param_name: Option<String>,
    /// Matching stops at this node and binds the full path
    wildcard: bool,
    /// Declared wildcard name; recorded only, the binding key is always `path`
    wildcard_name: Option<String>,
    /// Parameter names collected from the root to this node by the last
    /// registration that terminated here
    keys: Vec<Arc<str>>,
    /// Method table if a route terminates here
    entry: Option<RouteEntry<T>>,
}

impl<T> TrieNode<T> {
    fn new() -> Self {
        Self {
            literals: HashMap::new(),
            param_child: None,
            param_name: None,
            wildcard: false,
            wildcard_name: None,
            keys: Vec::new(),
            entry: None,
        }
    }
}

/// Arena-backed prefix tree mapping route patterns to [`RouteEntry`] tables
#[derive(Debug)]
pub struct RouteTrie<T> {
    nodes: Vec<TrieNode<T>>,
}

impl<T> Default for RouteTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteTrie<T> {
    /// Create an empty trie containing only the root node
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::new()],
        }
    }

    fn push_node(&mut self) -> NodeId {
        self.nodes.push(TrieNode::new());
        self.nodes.len() - 1
    }

    /// Register a route pattern and return its method table.
    ///
    /// The table is created on first registration and reused afterwards, so
    /// several methods can be registered against the same pattern. The
    /// terminal node's parameter names are overwritten with the names from
    /// this pattern; the last registration of a shared terminal wins.
    pub fn add_route(&mut self, pattern: &str) -> &mut RouteEntry<T> {
        let mut keys: Vec<Arc<str>> = Vec::new();
        let mut node = ROOT;

        for token in tokenize(pattern) {
            match token {
                Token::Text(text) => {
                    node = match self.nodes[node].literals.get(text) {
                        Some(&child) => child,
                        None => {
                            let child = self.push_node();
                            self.nodes[node].literals.insert(text.to_string(), child);
                            child
                        }
                    };
                }
                Token::Wildcard(name) => {
                    let current = &mut self.nodes[node];
                    current.wildcard = true;
                    current.wildcard_name = Some(name.to_string());
                    debug!(pattern = %pattern, wildcard = %name, "Wildcard registered");
                }
                Token::Key(name) => {
                    let current = &mut self.nodes[node];
                    if let Some(previous) = current.param_name.as_deref() {
                        if previous != name {
                            warn!(
                                pattern = %pattern,
                                previous = %previous,
                                current = %name,
                                "Parameter renamed at shared tree position"
                            );
                        }
                    }
                    current.param_name = Some(name.to_string());
                    keys.push(Arc::from(name));
                    node = match self.nodes[node].param_child {
                        Some(child) => child,
                        None => {
                            let child = self.push_node();
                            self.nodes[node].param_child = Some(child);
                            child
                        }
                    };
                }
            }
        }

        let terminal = &mut self.nodes[node];
        terminal.keys = keys;
        terminal.entry.get_or_insert_with(RouteEntry::new)
    }

    /// Match a request path against the tree.
    ///
    /// Returns the terminal method table (if any) together with the bound
    /// parameters. A miss yields `entry: None` and no parameters.
    #[must_use]
    pub fn match_path(&self, path: &str) -> RouteMatch<'_, T> {
        let mut node = ROOT;
        let mut values: Vec<&str> = Vec::new();

        for part in path_parts(path) {
            let current = &self.nodes[node];
            if current.wildcard {
                debug!(
                    path = %path,
                    declared = current.wildcard_name.as_deref().unwrap_or_default(),
                    "Wildcard matched"
                );
                let mut params = ParamVec::new();
                params.push((Arc::from(WILDCARD_KEY), path.to_string()));
                return RouteMatch {
                    entry: current.entry.as_ref(),
                    params: Params::from(params),
                };
            }
            if let Some(&child) = current.literals.get(part) {
                node = child;
            } else if let Some(child) = current.param_child {
                values.push(part);
                node = child;
            } else {
                return RouteMatch {
                    entry: None,
                    params: Params::default(),
                };
            }
        }

        let terminal = &self.nodes[node];
        // Names and values are paired positionally; extras on either side are dropped.
        let params: ParamVec = terminal
            .keys
            .iter()
            .zip(values)
            .map(|(key, value)| (Arc::clone(key), value.to_string()))
            .collect();

        RouteMatch {
            entry: terminal.entry.as_ref(),
            params: Params::from(params),
        }
    }

    /// Number of nodes in the arena (root included)
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

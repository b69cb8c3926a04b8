//! Route classification.
//!
//! Routes are classified from the path alone, before any identity lookup,
//! so anonymous browsing keeps working when the identity provider is down.

pub const SIGN_IN_PATH: &str = "/sign-in";
pub const ONBOARDING_PATH: &str = "/onboarding";
pub const DASHBOARD_PATH: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Public,
    Onboarding,
    Protected,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Public => "public",
            RouteClass::Onboarding => "onboarding",
            RouteClass::Protected => "protected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePattern {
    /// Exactly this path.
    Exact(&'static str),
    /// This path and everything beneath it.
    Subtree(&'static str),
}

impl RoutePattern {
    pub fn matches(&self, path: &str) -> bool {
        match *self {
            RoutePattern::Exact(pattern) => path == pattern,
            RoutePattern::Subtree(prefix) => is_within(prefix, path),
        }
    }
}

/// `path` is `prefix` itself or lies beneath it on a segment boundary.
fn is_within(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// The portal's route table. Anything unmatched is protected.
pub const DEFAULT_ROUTES: &[(RoutePattern, RouteClass)] = &[
    (RoutePattern::Exact("/"), RouteClass::Public),
    (RoutePattern::Subtree(SIGN_IN_PATH), RouteClass::Public),
    (RoutePattern::Subtree("/sign-up"), RouteClass::Public),
    (RoutePattern::Subtree("/courses"), RouteClass::Public),
    (RoutePattern::Subtree("/search"), RouteClass::Public),
    (RoutePattern::Subtree("/api/draft-mode"), RouteClass::Public),
    (RoutePattern::Subtree("/api/stripe-checkout"), RouteClass::Public),
    (RoutePattern::Subtree(ONBOARDING_PATH), RouteClass::Onboarding),
];

/// Ordered (pattern, class) table; the first matching entry wins.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<(RoutePattern, RouteClass)>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTES.to_vec())
    }
}

impl RouteTable {
    pub fn new(entries: Vec<(RoutePattern, RouteClass)>) -> Self {
        Self { entries }
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        self.entries
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(_, class)| *class)
            .unwrap_or(RouteClass::Protected)
    }
}

/// Prefixes for framework-internal assets.
const ASSET_PREFIXES: &[&str] = &["/_next", "/static"];

/// Prefixes that always go through the gate, whatever they look like.
const ALWAYS_GATED_PREFIXES: &[&str] = &["/api", "/trpc"];

const ASSET_EXTENSIONS: &[&str] = &[
    "html",
    "htm",
    "css",
    "js",
    "jpg",
    "jpeg",
    "webp",
    "png",
    "gif",
    "svg",
    "ttf",
    "woff",
    "woff2",
    "ico",
    "csv",
    "doc",
    "docx",
    "xls",
    "xlsx",
    "zip",
    "webmanifest",
];

/// Whether the request bypasses the gate entirely.
pub fn is_static_asset(path: &str) -> bool {
    if ALWAYS_GATED_PREFIXES.iter().any(|prefix| is_within(prefix, path)) {
        return false;
    }
    if ASSET_PREFIXES.iter().any(|prefix| is_within(prefix, path)) {
        return true;
    }

    let last_segment = path.rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => ASSET_EXTENSIONS
            .iter()
            .any(|ext| extension.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

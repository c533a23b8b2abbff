use std::collections::HashMap;

/// Concept words mapped to the name fragments files about them tend to carry
#[derive(Debug, Clone)]
pub struct SynonymTable {
    /// concept -> [fragments]
    fragments: HashMap<String, Vec<String>>,
}

impl SynonymTable {
    /// Create a table with built-in programming synonyms
    pub fn new() -> Self {
        let mut table = Self::empty();

        // Identity
        table.group(
            &["auth", "authentication", "authenticate", "authorization", "identity", "login", "signin", "logout"],
            &["auth", "user", "account", "session", "login", "identity", "credential", "token", "password"],
        );
        table.group(
            &["user", "users", "account", "profile", "member"],
            &["user", "account", "profile", "member", "customer"],
        );
        table.group(
            &["permission", "permissions", "role", "roles", "access"],
            &["permission", "role", "policy", "acl", "guard"],
        );

        // Persistence
        table.group(
            &["database", "db", "storage", "persistence", "sql", "migration"],
            &["db", "database", "model", "schema", "repository", "repo", "migration", "orm", "sql", "store"],
        );
        table.group(
            &["cache", "caching", "memoize"],
            &["cache", "memo", "redis", "store"],
        );

        // Configuration and diagnostics
        table.group(
            &["config", "configuration", "settings", "options", "environment"],
            &["config", "settings", "env", "options", "preferences"],
        );
        table.group(
            &["error", "errors", "exception", "failure", "crash", "bug"],
            &["error", "exception", "fault", "failure", "panic"],
        );
        table.group(
            &["log", "logging", "logger", "tracing"],
            &["log", "logger", "logging", "trace"],
        );
        table.group(
            &["test", "tests", "testing", "coverage"],
            &["test", "spec", "fixture", "mock"],
        );

        // Surfaces
        table.group(
            &["api", "endpoint", "route", "routes", "http", "rest"],
            &["api", "route", "router", "endpoint", "controller", "handler", "view"],
        );
        table.group(
            &["ui", "frontend", "page", "screen", "component"],
            &["component", "view", "page", "template", "screen", "widget"],
        );

        // Business
        table.group(
            &["payment", "payments", "billing", "checkout", "invoice"],
            &["payment", "billing", "invoice", "checkout", "order", "stripe"],
        );
        table.group(
            &["notification", "notifications", "email", "mail", "message"],
            &["notify", "notification", "email", "mail", "message"],
        );
        table.group(
            &["search", "lookup", "find", "query"],
            &["search", "query", "index", "finder", "lookup"],
        );

        table
    }

    /// A table with no entries
    pub fn empty() -> Self {
        Self {
            fragments: HashMap::new(),
        }
    }

    /// Map every concept in `concepts` to `fragments`
    pub fn group(&mut self, concepts: &[&str], fragments: &[&str]) {
        for concept in concepts {
            for fragment in fragments {
                self.insert(concept, fragment);
            }
        }
    }

    /// Add one fragment for a concept; duplicates are ignored
    pub fn insert(&mut self, concept: &str, fragment: &str) {
        let entry = self.fragments.entry(concept.to_lowercase()).or_default();
        let fragment = fragment.to_lowercase();
        if !fragment.is_empty() && !entry.contains(&fragment) {
            entry.push(fragment);
        }
    }

    /// Fragments for a keyword, empty when the keyword is not a known concept
    pub fn fragments(&self, keyword: &str) -> &[String] {
        self.fragments
            .get(keyword)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::new()
    }
}

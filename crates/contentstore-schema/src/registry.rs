//! Content type lookup by any of its identifiers.
//!
//! A content type can be named by its key, slug, singular slug, name or
//! singular name, and each of the slug-like identifiers also in slugified
//! form. The registry precomputes an index from every alias to the content
//! type it names, so a lookup is a handful of hash probes.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use contentstore_core::{ContentType, Error, Result};
use regex::Regex;

use crate::config::StorageConfig;

/// Number of alias tiers, see [`SchemaRegistry::resolve`].
const TIERS: usize = 8;

/// Tiers whose aliases are slugs; a slugified identifier is retried here.
const SLUG_TIERS: [usize; 3] = [1, 3, 5];

fn slug_separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("slug separator pattern is valid"))
}

/// Normalize a human-readable name into a URL-safe slug.
///
/// Lower-cases, collapses every run of non-alphanumeric characters into a
/// single `-` and trims separators from both ends.
///
/// ```
/// use contentstore_schema::slugify;
/// assert_eq!(slugify("Foo Bar"), "foo-bar");
/// assert_eq!(slugify("foo_bars"), "foo-bars");
/// assert_eq!(slugify("  --Hello,  World!-- "), "hello-world");
/// ```
pub fn slugify(input: &str) -> String {
    let lower = input.to_lowercase();
    slug_separators()
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// Registry of the content types known to the storage layer.
///
/// Read-only once built, except that registering a content type whose key is
/// already present replaces the earlier definition.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    content_types: Vec<Arc<ContentType>>,
    tiers: [HashMap<String, usize>; TIERS],
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            content_types: Vec::new(),
            tiers: std::array::from_fn(|_| HashMap::new()),
        }
    }

    /// Build a registry from the content types in a configuration.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let mut registry = Self::new();
        for content_type in config.content_type_definitions()? {
            registry.register(content_type);
        }
        Ok(registry)
    }

    /// Register a content type, replacing any with the same key.
    pub fn register(&mut self, content_type: ContentType) -> Arc<ContentType> {
        let content_type = Arc::new(content_type);
        if let Some(existing) = self
            .content_types
            .iter_mut()
            .find(|ct| ct.key == content_type.key)
        {
            tracing::debug!(key = %content_type.key, "Replacing registered content type");
            *existing = Arc::clone(&content_type);
        } else {
            tracing::debug!(key = %content_type.key, table = %content_type.table_name, "Registering content type");
            self.content_types.push(Arc::clone(&content_type));
        }
        self.rebuild_index();
        content_type
    }

    fn rebuild_index(&mut self) {
        for tier in &mut self.tiers {
            tier.clear();
        }
        for (idx, ct) in self.content_types.iter().enumerate() {
            let aliases: [String; TIERS] = [
                ct.key.clone(),
                slugify(&ct.key),
                ct.slug.clone(),
                slugify(&ct.slug),
                ct.singular_slug.clone(),
                slugify(&ct.singular_slug),
                ct.singular_name.clone(),
                ct.name.clone(),
            ];
            for (tier, alias) in self.tiers.iter_mut().zip(aliases) {
                if !alias.is_empty() {
                    // Earlier registrations keep an alias they share with later ones.
                    tier.entry(alias).or_insert(idx);
                }
            }
        }
    }

    /// Resolve an identifier to its content type.
    ///
    /// Tiers are checked in order: exact key, slugified key, slug, slugified
    /// slug, singular slug, slugified singular slug, singular name, name. The
    /// first match wins. If nothing matches, the slugified identifier is tried
    /// against the slug tiers, so `"Foo Bars"` finds the `foo_bars` key.
    pub fn resolve(&self, identifier: &str) -> Result<Arc<ContentType>> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(Error::SchemaNotFound(String::new()));
        }

        if let Some(idx) = self.tiers.iter().find_map(|tier| tier.get(identifier)) {
            return Ok(Arc::clone(&self.content_types[*idx]));
        }

        let slug = slugify(identifier);
        SLUG_TIERS
            .iter()
            .find_map(|&t| self.tiers[t].get(&slug))
            .map(|idx| Arc::clone(&self.content_types[*idx]))
            .ok_or_else(|| Error::SchemaNotFound(identifier.to_string()))
    }

    /// Exact lookup by key.
    pub fn get(&self, key: &str) -> Option<Arc<ContentType>> {
        self.content_types
            .iter()
            .find(|ct| ct.key == key)
            .map(Arc::clone)
    }

    /// Content types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ContentType>> {
        self.content_types.iter()
    }

    /// Keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.content_types.iter().map(|ct| ct.key.as_str())
    }

    /// Content types that free-text search covers.
    pub fn searchable(&self) -> impl Iterator<Item = &Arc<ContentType>> {
        self.content_types.iter().filter(|ct| ct.searchable)
    }

    /// Number of registered content types.
    pub fn len(&self) -> usize {
        self.content_types.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.content_types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foo_bars() -> ContentType {
        ContentType::new("foo_bars")
            .with_slug("foo_bars")
            .with_singular_slug("foo_bar")
            .with_name("FooBars")
            .with_singular_name("Foo Bar")
    }

    fn somethings() -> ContentType {
        ContentType::new("somethingelse")
            .with_slug("things")
            .with_singular_slug("thing")
            .with_name("Somethings")
            .with_singular_name("Something")
    }

    #[test]
    fn test_resolves_every_identifier() {
        let mut registry = SchemaRegistry::new();
        registry.register(foo_bars());
        registry.register(somethings());

        for ct in [foo_bars(), somethings()] {
            for identifier in [
                &ct.key,
                &ct.slug,
                &ct.singular_slug,
                &ct.name,
                &ct.singular_name,
            ] {
                let resolved = registry.resolve(identifier).unwrap();
                assert_eq!(*resolved, ct, "identifier {identifier:?}");
            }
        }
    }

    #[test]
    fn test_resolves_slugified_forms() {
        let mut registry = SchemaRegistry::new();
        registry.register(foo_bars());

        assert_eq!(registry.resolve("foo-bars").unwrap().key, "foo_bars");
        assert_eq!(registry.resolve("foo-bar").unwrap().key, "foo_bars");
        assert_eq!(registry.resolve("FOO BARS").unwrap().key, "foo_bars");
    }

    #[test]
    fn test_unknown_identifier() {
        let mut registry = SchemaRegistry::new();
        registry.register(foo_bars());
        assert!(matches!(
            registry.resolve("nothing"),
            Err(Error::SchemaNotFound(ref id)) if id == "nothing"
        ));
        assert!(registry.resolve("  ").is_err());
    }

    #[test]
    fn test_key_beats_slug_of_other_type() {
        let mut registry = SchemaRegistry::new();
        registry.register(ContentType::new("pages").with_slug("entries"));
        registry.register(ContentType::new("entries").with_slug("posts"));

        assert_eq!(registry.resolve("entries").unwrap().key, "entries");
        assert_eq!(registry.resolve("posts").unwrap().key, "entries");
    }

    #[test]
    fn test_register_replaces_same_key() {
        let mut registry = SchemaRegistry::new();
        registry.register(ContentType::new("pages").with_slug("old-pages"));
        registry.register(ContentType::new("pages").with_slug("new-pages"));

        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("old-pages").is_err());
        assert_eq!(registry.resolve("new-pages").unwrap().key, "pages");
    }

    #[test]
    fn test_searchable_filter() {
        let mut registry = SchemaRegistry::new();
        registry.register(ContentType::new("pages"));
        registry.register(ContentType::new("blocks").with_searchable(false));
        let keys: Vec<&str> = registry.searchable().map(|ct| ct.key.as_str()).collect();
        assert_eq!(keys, vec!["pages"]);
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["pages", "blocks"]);
    }
}

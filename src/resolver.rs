//! Bundle resolution: dependency walk, publishing, rendering and memoization.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::alias::{AliasMap, PathAliaser};
use crate::config::ResolverConfig;
use crate::descriptor::{
  BundleDescriptor, DescriptorLoader, FileDescriptorLoader, substitute_extra,
};
use crate::error::{ResolveError, Result};
use crate::models::{BundleLocation, ResolvedBundle};
use crate::publish::{PathHasher, Publisher};
use crate::render::{render_css, render_js};
use crate::store::{FileStore, OsFileStore};

/// Resolves bundle identifiers into head and body markup.
///
/// Each identifier is resolved once per resolver. Later calls return the cached [`Arc`] without
/// reloading the descriptor, so edits to descriptor files are not picked up until a new resolver
/// is built.
pub struct BundleResolver<A = AliasMap, L = FileDescriptorLoader, F = OsFileStore> {
  config: ResolverConfig,
  aliaser: A,
  loader: L,
  store: F,
  hasher: Option<PathHasher>,
  cache: HashMap<String, Arc<ResolvedBundle>>,
  ancestry: HashMap<String, Vec<String>>,
  locations: HashMap<String, BundleLocation>,
  published: HashSet<String>,
}

impl<A, L, F> fmt::Debug for BundleResolver<A, L, F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BundleResolver")
      .field("config", &self.config)
      .field("cached", &self.cache.len())
      .field("custom_hasher", &self.hasher.is_some())
      .finish()
  }
}

impl BundleResolver {
  /// Build a resolver over the local filesystem using the aliases declared in `config`.
  pub fn from_config(config: ResolverConfig) -> Result<Self> {
    let aliases = config.alias_map()?;
    Ok(Self::new(config, aliases, FileDescriptorLoader, OsFileStore))
  }
}

impl<A, L, F> BundleResolver<A, L, F>
where
  A: PathAliaser,
  L: DescriptorLoader,
  F: FileStore,
{
  /// Create a resolver from explicit collaborators.
  pub fn new(config: ResolverConfig, aliaser: A, loader: L, store: F) -> Self {
    Self {
      config,
      aliaser,
      loader,
      store,
      hasher: None,
      cache: HashMap::new(),
      ancestry: HashMap::new(),
      locations: HashMap::new(),
      published: HashSet::new(),
    }
  }

  /// Replace the default mtime-based publish basename.
  pub fn with_hasher(mut self, hasher: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
    let hasher: PathHasher = Arc::new(hasher);
    self.hasher = Some(hasher);
    self
  }

  /// Override the environment used to select descriptor overrides.
  pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
    self.config.environment = Some(environment.into());
    self
  }

  /// Active configuration.
  pub fn config(&self) -> &ResolverConfig {
    &self.config
  }

  /// Alias registry used for descriptors, sources and URLs.
  pub fn aliaser(&self) -> &A {
    &self.aliaser
  }

  /// Location a resolved bundle was rendered against.
  pub fn location(&self, identifier: &str) -> Option<&BundleLocation> {
    self.locations.get(identifier)
  }

  /// Whether a resolved bundle had a source directory linked into the public root.
  pub fn is_published(&self, identifier: &str) -> bool {
    self.published.contains(identifier)
  }

  /// Previously resolved bundle, without resolving it.
  pub fn cached(&self, identifier: &str) -> Option<Arc<ResolvedBundle>> {
    self.cache.get(identifier).cloned()
  }

  /// Resolve a bundle and everything it depends on.
  pub fn resolve(&mut self, identifier: &str) -> Result<Arc<ResolvedBundle>> {
    let mut stack = Vec::new();
    self.resolve_with_stack(identifier, &mut stack)
  }

  /// Resolve several bundles for one page and merge their markup.
  ///
  /// Bundles reachable from more than one identifier contribute their markup once. An identifier
  /// that another requested bundle already depends on is emitted where that bundle's dependency
  /// order places it; the remaining identifiers follow the order they were given in.
  pub fn resolve_page<I, S>(&mut self, identifiers: I) -> Result<ResolvedBundle>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut requested: Vec<String> = Vec::new();
    for identifier in identifiers {
      let identifier = identifier.as_ref();
      self.resolve(identifier)?;
      if !requested.iter().any(|entry| entry == identifier) {
        requested.push(identifier.to_string());
      }
    }

    let covered: HashSet<&String> = requested
      .iter()
      .filter_map(|identifier| self.ancestry.get(identifier))
      .flatten()
      .collect();

    let mut order: Vec<&String> = Vec::new();
    let mut seen = HashSet::new();
    for root in requested.iter().filter(|identifier| !covered.contains(identifier)) {
      let chain = self.ancestry.get(root).into_iter().flatten();
      for member in chain.chain(std::iter::once(root)) {
        if seen.insert(member) {
          order.push(member);
        }
      }
    }

    let members: Vec<Arc<ResolvedBundle>> = order
      .iter()
      .filter_map(|member| self.cache.get(*member).cloned())
      .collect();
    Ok(merge(&members, &ResolvedBundle::default()))
  }

  fn resolve_with_stack(
    &mut self,
    identifier: &str,
    stack: &mut Vec<String>,
  ) -> Result<Arc<ResolvedBundle>> {
    if let Some(bundle) = self.cache.get(identifier) {
      tracing::debug!("bundle cache hit for {}", identifier);
      return Ok(Arc::clone(bundle));
    }

    if let Some(start) = stack.iter().position(|entry| entry == identifier) {
      let mut chain = stack[start..].to_vec();
      chain.push(identifier.to_string());
      return Err(ResolveError::CircularDependency { chain });
    }

    let descriptor_location = self.aliaser.alias(identifier)?;
    let descriptor = self.loader.load(identifier, &descriptor_location)?;
    tracing::debug!("resolving bundle {} from {}", identifier, descriptor_location);

    stack.push(identifier.to_string());
    let mut ancestors: Vec<String> = Vec::new();
    for dependency in &descriptor.depends {
      self.resolve_with_stack(dependency, stack)?;
      let inherited = self.ancestry.get(dependency).cloned().unwrap_or_default();
      for member in inherited.into_iter().chain(std::iter::once(dependency.clone())) {
        if !ancestors.contains(&member) {
          ancestors.push(member);
        }
      }
    }
    stack.pop();

    let (location, published) = self.locate(&descriptor)?;
    let own = self.render_own(&descriptor, &location)?;

    let ancestor_bundles: Vec<Arc<ResolvedBundle>> = ancestors
      .iter()
      .filter_map(|member| self.cache.get(member).cloned())
      .collect();
    let bundle = Arc::new(merge(&ancestor_bundles, &own));

    self.ancestry.insert(identifier.to_string(), ancestors);
    self.locations.insert(identifier.to_string(), location);
    if published {
      self.published.insert(identifier.to_string());
    }
    self
      .cache
      .insert(identifier.to_string(), Arc::clone(&bundle));

    Ok(bundle)
  }

  /// Publish the bundle if it has a source, else fall back to descriptor and configured roots.
  ///
  /// The flag is `true` when the location came from publishing.
  fn locate(&self, descriptor: &BundleDescriptor) -> Result<(BundleLocation, bool)> {
    let publisher = Publisher::new(
      &self.config,
      &self.aliaser,
      &self.store,
      self.hasher.as_ref(),
    );
    if let Some(published) = publisher.publish(descriptor)? {
      return Ok((published, true));
    }

    let base_path = descriptor
      .base_path
      .as_deref()
      .unwrap_or(&self.config.base_path);
    let base_url = descriptor
      .base_url
      .as_deref()
      .unwrap_or(&self.config.base_url);
    let location = BundleLocation {
      base_path: self.aliaser.alias(base_path)?,
      base_url: self.aliaser.alias(base_url)?,
    };
    Ok((location, false))
  }

  fn render_own(
    &self,
    descriptor: &BundleDescriptor,
    location: &BundleLocation,
  ) -> Result<ResolvedBundle> {
    let extra = descriptor.extra_for(self.config.environment.as_deref());
    let mut own = ResolvedBundle::default();

    let css_options = &descriptor.css_options;
    for reference in &descriptor.css {
      let href = self.reference_url(location, reference.path(), extra)?;
      own.css_before_head_end.push_str(&render_css(
        &self.config.link_template,
        &href,
        reference.condition(css_options.condition.as_deref()),
        reference.noscript(css_options.noscript),
      ));
    }

    let js_options = &descriptor.js_options;
    for reference in &descriptor.js {
      let src = self.reference_url(location, reference.path(), extra)?;
      let html = render_js(
        &self.config.script_template,
        &src,
        reference.condition(js_options.condition.as_deref()),
      );
      if reference.before_head_end(js_options.before_head_end) {
        own.js_before_head_end.push_str(&html);
      } else {
        own.js_before_body_end.push_str(&html);
      }
    }

    Ok(own)
  }

  fn reference_url(
    &self,
    location: &BundleLocation,
    reference: &str,
    extra: &str,
  ) -> Result<String> {
    self
      .aliaser
      .alias(&location.url_for(&substitute_extra(reference, extra)))
  }
}

/// Combine ancestor bundles with a bundle's own fragments.
fn merge(ancestors: &[Arc<ResolvedBundle>], own: &ResolvedBundle) -> ResolvedBundle {
  let parts = || {
    ancestors
      .iter()
      .map(|bundle| &**bundle)
      .chain(std::iter::once(own))
  };

  let mut head = String::new();
  parts().for_each(|part| head.push_str(&part.css_before_head_end));
  parts().for_each(|part| head.push_str(&part.js_before_head_end));

  let mut body = String::new();
  parts().for_each(|part| body.push_str(&part.js_before_body_end));

  ResolvedBundle {
    css_before_head_end: own.css_before_head_end.clone(),
    js_before_head_end: own.js_before_head_end.clone(),
    js_before_body_end: own.js_before_body_end.clone(),
    head,
    body,
  }
}

use std::borrow::Cow;
use std::rc::Rc;

use crate::cache::TemplateCache;
use crate::compiler;
use crate::context::Context;
use crate::error::{StencilError, StencilResult};
use crate::interface::StencilInterface;
use crate::loader::{ArrayLoader, Loader, StringLoader};
use crate::template::{self, Template};

type EscapeFn = Box<dyn Fn(&str) -> String>;

/// The partials source. Either the default mutable named-template
/// collection, or a caller-supplied loader which is fixed once configured —
/// a configuration decision made at setup time, not a runtime type check.
enum Partials {
    Mutable(ArrayLoader),
    Fixed(Box<dyn Loader>),
}

/// `StencilEngine` wires the loader, the partials collection, the artifact
/// cache and the compile pipeline together.
///
/// The default engine treats render arguments as literal template source
/// (`StringLoader`), caches compiled artifacts in memory only, escapes
/// with minimal HTML entity escaping, and has an empty, mutable partials
/// collection.
///
/// # Examples
///
/// ```
/// use stencil::{Context, StencilEngine, StencilInterface};
///
/// let engine = StencilEngine::new();
///
/// let mut context = Context::new();
/// context.insert("name", "World");
///
/// let output = engine.render("Hello, {{ name }}!", Some(&context)).unwrap();
/// assert_eq!(output, "Hello, World!");
/// ```
pub struct StencilEngine {
    loader: Box<dyn Loader>,
    partials: Partials,
    cache: TemplateCache,
    prefix: String,
    charset: String,
    escape_fn: Option<EscapeFn>,
}

impl std::fmt::Debug for StencilEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StencilEngine")
            .field("prefix", &self.prefix)
            .field("charset", &self.charset)
            .field("has_escape_fn", &self.escape_fn.is_some())
            .finish_non_exhaustive()
    }
}

impl StencilEngine {
    pub fn new() -> Self {
        Self {
            loader: Box::new(StringLoader),
            partials: Partials::Mutable(ArrayLoader::new()),
            cache: TemplateCache::memory(),
            prefix: compiler::DEFAULT_PREFIX.to_string(),
            charset: "UTF-8".to_string(),
            escape_fn: None,
        }
    }

    /// Replaces the template source loader.
    pub fn set_loader<L: Loader + 'static>(&mut self, loader: L) -> &mut Self {
        self.loader = Box::new(loader);
        self
    }

    /// Replaces the partials source with a fixed loader. After this the
    /// partials collection can no longer be mutated through
    /// [`set_partials`](Self::set_partials).
    pub fn set_partials_loader<L: Loader + 'static>(&mut self, loader: L) -> &mut Self {
        self.partials = Partials::Fixed(Box::new(loader));
        self
    }

    /// Adds named partials to the mutable partials collection.
    ///
    /// # Errors
    /// `StencilError::Config` if a fixed partials loader was configured;
    /// a fixed collection rejects mutation rather than silently accepting
    /// it.
    pub fn set_partials<N, S, I>(&mut self, partials: I) -> StencilResult<&mut Self>
    where
        N: AsRef<str>,
        S: Into<String>,
        I: IntoIterator<Item = (N, S)>,
    {
        match &mut self.partials {
            Partials::Mutable(loader) => {
                for (name, source) in partials {
                    loader.set_template(name, source);
                }
                Ok(self)
            }
            Partials::Fixed(_) => Err(StencilError::Config {
                message: "the partials collection is fixed and cannot be mutated".to_string(),
            }),
        }
    }

    /// Replaces the artifact cache, e.g. with a file-backed one.
    pub fn set_cache(&mut self, cache: TemplateCache) -> &mut Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Sets the artifact-identifier prefix. Must be a valid identifier
    /// prefix in the host environment; it becomes part of the cache key
    /// and the persisted file name.
    pub fn set_template_prefix<P: Into<String>>(&mut self, prefix: P) -> &mut Self {
        self.prefix = prefix.into();
        self
    }

    pub fn set_charset<C: Into<String>>(&mut self, charset: C) -> &mut Self {
        self.charset = charset.into();
        self
    }

    /// Replaces the escaping transform applied to escaped variables.
    pub fn set_escape<F: Fn(&str) -> String + 'static>(&mut self, escape: F) -> &mut Self {
        self.escape_fn = Some(Box::new(escape));
        self
    }

    /// The artifact identifier `{prefix}{hash}` this engine derives for
    /// `source` — also the file name a file-backed cache persists it under.
    pub fn template_id(&self, source: &str) -> String {
        compiler::template_id(source, &self.prefix)
    }
}

impl Default for StencilEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StencilInterface for StencilEngine {
    fn load_template(&self, name: &str) -> StencilResult<Rc<Template>> {
        let source = self.loader.load(name)?;
        log::debug!("loading template ({} bytes of source)", source.len());
        self.cache.get_or_compile(&source, &self.prefix, Some(name))
    }

    fn load_partial(&self, name: &str) -> StencilResult<Rc<Template>> {
        let source = match &self.partials {
            Partials::Mutable(loader) => loader.load(name)?,
            Partials::Fixed(loader) => loader.load(name)?,
        };
        log::debug!("loading partial '{}'", name);
        self.cache.get_or_compile(&source, &self.prefix, Some(name))
    }

    fn render<N: AsRef<str>>(
        &self,
        template_name: N,
        context: Option<&Context>,
    ) -> StencilResult<String> {
        let template = self.load_template(template_name.as_ref())?;
        template.render(context, Some(self))
    }

    fn escape<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match &self.escape_fn {
            Some(escape) => Cow::Owned(escape(text)),
            None => template::html_escape(text),
        }
    }

    fn charset(&self) -> &str {
        &self.charset
    }
}

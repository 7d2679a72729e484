use std::borrow::Cow;
use std::rc::Rc;

use crate::context::Context;
use crate::error::StencilResult;
use crate::template::Template;

/// The engine seam consumed by compiled templates at render time:
/// template and partial resolution, the escaping transform, and the
/// configured character set.
///
/// `Template::render` takes any implementation, so custom engines can be
/// swapped in for the default `StencilEngine`.
pub trait StencilInterface {
    /// Loads `name` through the source loader and compiles it, consulting
    /// the artifact cache.
    ///
    /// # Errors
    /// - If the name is unresolvable.
    /// - If the source fails to compile or the cache fails to persist.
    fn load_template(&self, name: &str) -> StencilResult<Rc<Template>>;

    /// Like `load_template`, but resolving through the partials
    /// collection. Partials compiled here are cache-eligible like any
    /// other template.
    fn load_partial(&self, name: &str) -> StencilResult<Rc<Template>>;

    /// Loads and renders the named template in one call.
    ///
    /// # Errors
    /// - If the template cannot be loaded or compiled.
    /// - If rendering fails (e.g. partial recursion limit).
    fn render<N: AsRef<str>>(
        &self,
        template_name: N,
        context: Option<&Context>,
    ) -> StencilResult<String>;

    /// The transform applied to escaped variable interpolations.
    fn escape<'t>(&self, text: &'t str) -> Cow<'t, str>;

    /// The configured character set. Threaded through to the escaping
    /// step; the engine applies no transformation based on it.
    fn charset(&self) -> &str;
}

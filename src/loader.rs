use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::{StencilError, StencilResult};

/// Template source acquisition. The engine consults one loader for top
/// level templates and one for partials.
pub trait Loader {
    /// Resolves `name` to template source.
    ///
    /// # Errors
    /// `StencilError::MissingTemplate` if `name` is unresolvable.
    fn load<'s>(&'s self, name: &'s str) -> StencilResult<Cow<'s, str>>;
}

/// The passthrough loader: the "name" is the template source itself.
/// Lets `render` accept literal template strings.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StringLoader;

impl Loader for StringLoader {
    fn load<'s>(&'s self, name: &'s str) -> StencilResult<Cow<'s, str>> {
        Ok(Cow::Borrowed(name))
    }
}

/// A named in-memory template collection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArrayLoader {
    templates: HashMap<String, String>,
}

impl ArrayLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_template<N: AsRef<str>, S: Into<String>>(
        &mut self,
        name: N,
        source: S,
    ) -> &mut Self {
        self.templates
            .insert(name.as_ref().to_string(), source.into());
        self
    }
}

impl<N: AsRef<str>, S: Into<String>> FromIterator<(N, S)> for ArrayLoader {
    fn from_iter<I: IntoIterator<Item = (N, S)>>(iter: I) -> Self {
        let mut loader = Self::new();
        for (name, source) in iter {
            loader.set_template(name, source);
        }
        loader
    }
}

impl Loader for ArrayLoader {
    fn load<'s>(&'s self, name: &'s str) -> StencilResult<Cow<'s, str>> {
        self.templates
            .get(name)
            .map(|source| Cow::Borrowed(source.as_str()))
            .ok_or_else(|| StencilError::MissingTemplate {
                template_name: name.to_string(),
            })
    }
}

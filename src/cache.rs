use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::compiler;
use crate::error::{StencilError, StencilResult};
use crate::parser;
use crate::template::Template;
use crate::token::{self, Delimiters};

/// Compiled-artifact cache.
///
/// Always keeps an in-memory map keyed by artifact identifier; a
/// file-backed cache additionally persists one file per template, named
/// exactly by the identifier, containing the serialized artifact. Entries
/// are content-addressed and never mutated in place: rewriting a key only
/// ever writes byte-identical content.
pub struct TemplateCache {
    dir: Option<PathBuf>,
    templates: RefCell<HashMap<String, Rc<Template>>>,
    compiles: Cell<usize>,
}

impl TemplateCache {
    /// An in-memory-only cache. Touches no file system and has no
    /// file-system failure path.
    pub fn memory() -> Self {
        Self {
            dir: None,
            templates: RefCell::new(HashMap::new()),
            compiles: Cell::new(0),
        }
    }

    /// A file-backed cache persisting artifacts under `dir`. The directory
    /// is created on first write.
    pub fn disk<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: Some(dir.into()),
            templates: RefCell::new(HashMap::new()),
            compiles: Cell::new(0),
        }
    }

    /// The cache directory, if file-backed.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// How many compilations this cache has performed; hits do not count.
    pub fn compile_count(&self) -> usize {
        self.compiles.get()
    }

    /// Returns the compiled artifact for `source`, compiling at most once
    /// per key. Lookup order: memory, then disk (if configured), then
    /// compile-and-persist.
    ///
    /// # Errors
    /// - `StencilError::Syntax` if a miss forces compilation and the
    ///   source is malformed.
    /// - `StencilError::Cache` if persisting the artifact fails; no
    ///   partial entry is left visible under the key.
    pub fn get_or_compile(
        &self,
        source: &str,
        prefix: &str,
        name: Option<&str>,
    ) -> StencilResult<Rc<Template>> {
        let id = compiler::template_id(source, prefix);

        if let Some(template) = self.templates.borrow().get(&id) {
            log::debug!("cache hit for {}", id);
            return Ok(Rc::clone(template));
        }

        if let Some(dir) = &self.dir {
            let path = dir.join(&id);
            match fs::read_to_string(&path) {
                Ok(contents) => match serde_json::from_str::<Template>(&contents) {
                    Ok(template) => {
                        log::debug!("disk cache hit for {}", id);
                        let template = Rc::new(template);
                        self.templates
                            .borrow_mut()
                            .insert(id, Rc::clone(&template));
                        return Ok(template);
                    }
                    Err(error) => {
                        // Corrupt entry: recompile and atomically rewrite.
                        log::warn!(
                            "discarding corrupt cache entry {}: {}",
                            path.display(),
                            error
                        );
                    }
                },
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => {
                    log::warn!("unreadable cache entry {}: {}", path.display(), error);
                }
            }
        }

        log::debug!("cache miss for {}, compiling", id);
        let tokens = token::tokenize(source, Delimiters::default())?;
        let nodes = parser::parse(source, tokens)?;
        let template = compiler::compile(nodes, id.clone(), name);
        self.compiles.set(self.compiles.get() + 1);

        if let Some(dir) = &self.dir {
            persist(dir, &id, &template)?;
        }

        let template = Rc::new(template);
        self.templates
            .borrow_mut()
            .insert(id, Rc::clone(&template));
        Ok(template)
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::memory()
    }
}

impl std::fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateCache")
            .field("dir", &self.dir)
            .field("entries", &self.templates.borrow().len())
            .field("compiles", &self.compiles.get())
            .finish()
    }
}

/// Writes the artifact to a temporary file in the cache directory, then
/// renames it into place. The rename is the atomicity primitive: a
/// concurrent reader of the key sees either no entry or a fully-formed
/// one, never a torn one. On failure the temporary file is cleaned up and
/// nothing becomes visible under the final path.
fn persist(dir: &Path, id: &str, template: &Template) -> StencilResult<()> {
    fs::create_dir_all(dir).map_err(|error| StencilError::Cache {
        message: format!(
            "failed to create cache directory {}: {}",
            dir.display(),
            error
        ),
    })?;

    let json = serde_json::to_string(template).map_err(|error| StencilError::Cache {
        message: format!("failed to serialize artifact {}: {}", id, error),
    })?;

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|error| StencilError::Cache {
        message: format!(
            "failed to create temporary file in {}: {}",
            dir.display(),
            error
        ),
    })?;
    file.write_all(json.as_bytes())
        .map_err(|error| StencilError::Cache {
            message: format!("failed to write artifact {}: {}", id, error),
        })?;

    let path = dir.join(id);
    file.persist(&path).map_err(|error| StencilError::Cache {
        message: format!(
            "failed to move cache entry into place at {}: {}",
            path.display(),
            error.error
        ),
    })?;
    log::debug!("persisted artifact {}", path.display());
    Ok(())
}

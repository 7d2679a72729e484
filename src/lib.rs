mod ast;
mod cache;
mod compiler;
mod context;
mod engine;
mod error;
mod interface;
mod loader;
mod parser;
mod template;
mod token;

// Public exports.
pub use cache::TemplateCache;
pub use context::{Context, LambdaFn, Value};
pub use engine::StencilEngine;
pub use error::{StencilError, StencilResult, SyntaxError, SyntaxErrorKind};
pub use interface::StencilInterface;
pub use loader::{ArrayLoader, Loader, StringLoader};
pub use template::Template;

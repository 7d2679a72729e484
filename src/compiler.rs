use sha2::{Digest, Sha256};

use crate::ast::Node;
use crate::error::StencilResult;
use crate::parser;
use crate::template::{Step, Template};
use crate::token::{self, Delimiters};

/// Default artifact-identifier prefix; replaceable per engine.
pub(crate) const DEFAULT_PREFIX: &str = "Stencil_Template_";

/// Derives the artifact identifier for `source` under `prefix`: the prefix
/// followed by a SHA-256 over the crate version, the prefix and the source
/// bytes. Deterministic, collision-resistant, and a valid identifier as
/// long as the prefix is one. Delimiter changes are baked into the source
/// text and therefore into the hash.
pub(crate) fn template_id(source: &str, prefix: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(env!("CARGO_PKG_VERSION").as_bytes());
    hasher.update([0]);
    hasher.update(prefix.as_bytes());
    hasher.update([0]);
    hasher.update(source.as_bytes());
    format!("{}{:x}", prefix, hasher.finalize())
}

/// Runs the full pipeline over `source`: tokenize from the given
/// delimiters, parse, compile.
///
/// # Errors
/// Any `SyntaxError` from tokenization or parsing.
pub(crate) fn compile_source(
    source: &str,
    prefix: &str,
    name: Option<&str>,
    delimiters: Delimiters,
) -> StencilResult<Template> {
    let tokens = token::tokenize(source, delimiters)?;
    let nodes = parser::parse(source, tokens)?;
    Ok(compile(nodes, template_id(source, prefix), name))
}

/// Lowers a parsed node tree into an owned step program. Deterministic and
/// free of side effects: identical trees always produce identical steps,
/// and persistence is the cache's concern, not the compiler's. The
/// resulting artifact holds no reference back to the source text.
pub(crate) fn compile(nodes: Vec<Node<'_>>, id: String, name: Option<&str>) -> Template {
    Template {
        id,
        name: name.map(str::to_string),
        steps: compile_nodes(nodes),
    }
}

fn compile_nodes(nodes: Vec<Node<'_>>) -> Vec<Step> {
    nodes
        .into_iter()
        .map(|node| match node {
            Node::Text { text } => Step::Text {
                text: text.to_string(),
            },
            Node::Variable { path, escape } => Step::Variable {
                path: path.iter().map(|s| (*s).to_string()).collect(),
                escape,
            },
            Node::Section {
                path,
                inverted,
                children,
                raw,
                delimiters,
            } => Step::Section {
                path: path.iter().map(|s| (*s).to_string()).collect(),
                inverted,
                body: compile_nodes(children),
                raw: raw.to_string(),
                delimiters,
            },
            Node::Partial { name, indent } => Step::Partial {
                name: name.to_string(),
                indent: indent.to_string(),
            },
        })
        .collect()
}

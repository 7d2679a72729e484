use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::compiler;
use crate::context::{Context, ContextStack, Value};
use crate::error::{StencilError, StencilResult};
use crate::interface::StencilInterface;
use crate::token::Delimiters;

/// Upper bound on partial/lambda re-entry during one render call. A
/// self-including partial hits this and fails with a render error instead
/// of overflowing the stack; the artifact stays valid for other inputs.
pub(crate) const MAX_RENDER_DEPTH: usize = 128;

/// One executable instruction of a compiled template, mirroring the parsed
/// tree one-to-one but owning its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum Step {
    Text {
        text: String,
    },
    Variable {
        path: Vec<String>,
        escape: bool,
    },
    Section {
        path: Vec<String>,
        inverted: bool,
        body: Vec<Step>,
        /// Verbatim body source, handed to lambda section values.
        raw: String,
        /// Delimiters in effect at the opening tag, used to re-parse
        /// lambda output.
        delimiters: Delimiters,
    },
    Partial {
        name: String,
        indent: String,
    },
}

/// A compiled template artifact.
///
/// Produced by the compile pipeline, owned by the cache or the caller, and
/// holding no reference to the source it came from; serializing it yields a
/// self-contained render routine that loads without the original source.
///
/// # Example
///
/// ```
/// use stencil::{Context, StencilEngine, Template};
///
/// let template = Template::new("Hello, {{ name }}!").unwrap();
///
/// let mut context = Context::new();
/// context.insert("name", "World");
///
/// let result = template.render::<StencilEngine>(Some(&context), None).unwrap();
/// assert_eq!(result, "Hello, World!");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Artifact identifier: naming prefix + content hash.
    pub(crate) id: String,
    /// Optional human-meaningful name for diagnostics.
    pub(crate) name: Option<String>,
    pub(crate) steps: Vec<Step>,
}

impl Template {
    /// Compiles `source` through the full pipeline with default delimiters
    /// and the default naming prefix.
    ///
    /// # Errors
    /// `StencilError::Syntax` if the template is malformed.
    pub fn new<T: AsRef<str>>(source: T) -> StencilResult<Self> {
        compiler::compile_source(
            source.as_ref(),
            compiler::DEFAULT_PREFIX,
            None,
            Delimiters::default(),
        )
    }

    /// The artifact identifier (`{prefix}{hash}`), also the cache file name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The diagnostic name, if one was given at compile time.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Renders the template against `context`.
    ///
    /// Escaped variables go through the engine's escape transform, or
    /// minimal HTML entity escaping (`& < > " '`) with no engine. Partial
    /// tags need an engine to resolve them and fail with
    /// `StencilError::Render` otherwise.
    ///
    /// # Errors
    /// - `StencilError::Render` if the partial/lambda recursion limit is
    ///   exceeded, or a partial is reached with no engine.
    /// - Errors from the engine while loading partials.
    ///
    /// Variable lookup misses are not errors; they interpolate as the
    /// empty string.
    pub fn render<E: StencilInterface>(
        &self,
        context: Option<&Context>,
        engine: Option<&E>,
    ) -> StencilResult<String> {
        let default_context = Context::default();
        let context = context.unwrap_or(&default_context);
        let mut stack = ContextStack::new(context);
        let mut output = String::new();
        render_steps(&self.steps, &mut stack, &mut output, engine, 0)?;
        Ok(output)
    }
}

fn render_steps<'v, E: StencilInterface>(
    steps: &[Step],
    stack: &mut ContextStack<'v>,
    output: &mut String,
    engine: Option<&E>,
    depth: usize,
) -> StencilResult<()> {
    for step in steps {
        match step {
            Step::Text { text } => output.push_str(text),
            Step::Variable { path, escape } => {
                if let Some(value) = stack.resolve(path) {
                    let text = value.render_text();
                    if *escape {
                        match engine {
                            Some(engine) => output.push_str(&engine.escape(&text)),
                            None => output.push_str(&html_escape(&text)),
                        }
                    } else {
                        output.push_str(&text);
                    }
                }
            }
            Step::Section {
                path,
                inverted,
                body,
                raw,
                delimiters,
            } => {
                let value = stack.resolve(path);
                if *inverted {
                    if value.is_none_or(|v| !v.is_truthy()) {
                        render_steps(body, stack, output, engine, depth)?;
                    }
                } else {
                    match value {
                        None => {}
                        Some(Value::Lambda(lambda)) => {
                            check_depth(depth, "lambda expansion")?;
                            let expanded = lambda(raw);
                            let template = compiler::compile_source(
                                &expanded,
                                compiler::DEFAULT_PREFIX,
                                None,
                                delimiters.clone(),
                            )?;
                            render_steps(&template.steps, stack, output, engine, depth + 1)?;
                        }
                        Some(Value::List(items)) => {
                            for item in items {
                                stack.push(item);
                                let result = render_steps(body, stack, output, engine, depth);
                                stack.pop();
                                result?;
                            }
                        }
                        Some(value) if value.is_truthy() => {
                            stack.push(value);
                            let result = render_steps(body, stack, output, engine, depth);
                            stack.pop();
                            result?;
                        }
                        Some(_) => {}
                    }
                }
            }
            Step::Partial { name, indent } => {
                let Some(engine) = engine else {
                    return Err(StencilError::Render {
                        message: format!("cannot render partial '{}' without an engine", name),
                    });
                };
                check_depth(depth, name)?;
                let partial = engine.load_partial(name)?;
                if indent.is_empty() {
                    render_steps(&partial.steps, stack, output, Some(engine), depth + 1)?;
                } else {
                    // Partials inherit the caller's context stack; only
                    // their output lines get the standalone indentation.
                    let mut nested = String::new();
                    render_steps(&partial.steps, stack, &mut nested, Some(engine), depth + 1)?;
                    push_indented(output, &nested, indent);
                }
            }
        }
    }
    Ok(())
}

fn check_depth(depth: usize, what: &str) -> StencilResult<()> {
    if depth >= MAX_RENDER_DEPTH {
        return Err(StencilError::Render {
            message: format!(
                "render recursion limit ({}) exceeded at {}",
                MAX_RENDER_DEPTH, what
            ),
        });
    }
    Ok(())
}

/// Appends `text` with `indent` prefixed to every line.
fn push_indented(output: &mut String, text: &str, indent: &str) {
    if text.is_empty() {
        return;
    }
    output.push_str(indent);
    let mut rest = text;
    while let Some(newline) = rest.find('\n') {
        output.push_str(&rest[..=newline]);
        rest = &rest[newline + 1..];
        if !rest.is_empty() {
            output.push_str(indent);
        }
    }
    output.push_str(rest);
}

/// Minimal HTML entity escaping: the five characters `& < > " '`.
pub(crate) fn html_escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

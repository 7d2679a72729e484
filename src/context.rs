use std::borrow::Cow;
use std::collections::BTreeMap;
use std::rc::Rc;

/// A section lambda: receives the section's raw, uninterpreted template
/// source and returns replacement template text.
pub type LambdaFn = dyn Fn(&str) -> String;

/// A render-time data value.
///
/// Truthiness intentionally differs from some host languages: `Null`,
/// `Bool(false)`, the empty string and the empty list are falsy; everything
/// else — including `Number(0.0)` and the empty map — is truthy.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Lambda(Rc<LambdaFn>),
}

impl Value {
    /// Wraps a closure as a section lambda value.
    pub fn lambda<F: Fn(&str) -> String + 'static>(lambda: F) -> Self {
        Self::Lambda(Rc::new(lambda))
    }

    /// Section and inverted-section truthiness. Note that a zero number is
    /// truthy: only absence, `false`, the empty string and the empty list
    /// count as falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::String(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Number(_) | Self::Map(_) | Self::Lambda(_) => true,
        }
    }

    /// Text form used for variable interpolation. Composite and callable
    /// values interpolate as nothing, like a missed lookup.
    pub(crate) fn render_text(&self) -> Cow<'_, str> {
        match self {
            Self::Null | Self::List(_) | Self::Map(_) | Self::Lambda(_) => Cow::Borrowed(""),
            Self::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Self::String(s) => Cow::Borrowed(s),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    Cow::Owned(format!("{}", *n as i64))
                } else {
                    Cow::Owned(n.to_string())
                }
            }
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::String(s) => f.debug_tuple("String").field(s).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Self::Lambda(_) => write!(f, "Lambda(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Lambda(a), Self::Lambda(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

impl From<Context> for Value {
    fn from(context: Context) -> Self {
        Self::Map(context.data)
    }
}

/// The caller-built root data mapping for one render call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Context {
    data: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<N: AsRef<str>, V: Into<Value>>(&mut self, name: N, value: V) -> &mut Self {
        self.data.insert(name.as_ref().to_string(), value.into());
        self
    }

    pub fn get<N: AsRef<str>>(&self, name: N) -> Option<&Value> {
        self.data.get(name.as_ref())
    }

    pub fn contains<N: AsRef<str>>(&self, name: N) -> bool {
        self.data.contains_key(name.as_ref())
    }

    pub(crate) const fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }
}

/// The stack of in-scope frames during one render call. The root frame is
/// the caller's `Context` and is never popped; section bodies push one
/// frame per iteration item (or one for a truthy non-sequence value) and
/// pop it on exit. Borrows the data only for the duration of the call.
pub(crate) struct ContextStack<'v> {
    root: &'v BTreeMap<String, Value>,
    frames: Vec<&'v Value>,
}

impl<'v> ContextStack<'v> {
    pub(crate) fn new(root: &'v Context) -> Self {
        Self {
            root: root.data(),
            frames: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, value: &'v Value) {
        self.frames.push(value);
    }

    pub(crate) fn pop(&mut self) {
        self.frames.pop();
    }

    /// Resolves a dotted path against the stack. `.` is the whole current
    /// frame. The first segment searches frames innermost-first (falling
    /// back to the root mapping); once a frame yields it, the remaining
    /// segments are resolved only against that result — a miss partway
    /// through never restarts the stack search. Misses are a normal
    /// absent-value outcome, not an error.
    pub(crate) fn resolve<S: AsRef<str>>(&self, path: &[S]) -> Option<&'v Value> {
        let first = path.first()?.as_ref();
        if first == "." {
            return self.frames.last().copied();
        }

        let mut current = self
            .frames
            .iter()
            .rev()
            .find_map(|frame| match frame {
                Value::Map(map) => map.get(first),
                _ => None,
            })
            .or_else(|| self.root.get(first))?;

        for segment in &path[1..] {
            let Value::Map(map) = current else {
                return None;
            };
            current = map.get(segment.as_ref())?;
        }
        Some(current)
    }
}

//! Dynamically-typed values for the script binding.
//!
//! `Value` equality is SameValueZero: primitives compare by content (with
//! `-0 == +0` and `NaN == NaN`), everything else by identity. It is defined
//! as equality of [`IdentityKey`] tokens, so a `Value` behaves the same as a
//! key of an [`OrderedMap`] and under `==`.

use crate::identity::{address_token, number_bits, IdentityKey, Token};
use crate::live_iter::Keys;
use crate::ordered_map::OrderedMap;
use crate::script::{ScriptMap, ScriptSet};
use core::fmt;
use std::rc::Rc;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(Object),
    Function(Function),
    Map(ScriptMap),
    Set(ScriptSet),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Name of the value's runtime type, as `typeof` would report it.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Null | Value::Object(_) | Value::Map(_) | Value::Set(_) => "object",
        }
    }
}

impl IdentityKey for Value {
    fn token(&self) -> Token<'_> {
        match self {
            Value::Undefined => Token::Undefined,
            Value::Null => Token::Null,
            Value::Bool(b) => Token::Bool(*b),
            Value::Number(n) => Token::Number(number_bits(*n)),
            Value::String(s) => Token::Str(s.as_ref()),
            Value::Object(o) => o.token(),
            Value::Function(f) => f.token(),
            Value::Map(m) => m.token(),
            Value::Set(s) => s.token(),
        }
    }

    fn canonical(self) -> Self {
        match self {
            Value::Number(n) => Value::Number(n.canonical()),
            other => other,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.token() == other.token()
    }
}

impl Eq for Value {}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(o) => fmt::Debug::fmt(o, f),
            Value::Function(func) => fmt::Debug::fmt(func, f),
            // Containers may hold themselves; print the size only.
            Value::Map(m) => write!(f, "Map({})", m.size()),
            Value::Set(s) => write!(f, "Set({})", s.size()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<ScriptMap> for Value {
    fn from(m: ScriptMap) -> Self {
        Value::Map(m)
    }
}

impl From<ScriptSet> for Value {
    fn from(s: ScriptSet) -> Self {
        Value::Set(s)
    }
}

/// Plain object: a property bag compared by identity.
///
/// Using an object as a map key or set element reads only its address; no
/// property is added.
#[derive(Clone, Default)]
pub struct Object {
    props: OrderedMap<String, Value>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.props.set(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.props.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.props.has(name)
    }

    /// Own property names in creation order.
    pub fn keys(&self) -> Keys<String, Value> {
        self.props.keys()
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.props.ptr_eq(&other.props)
    }
}

impl IdentityKey for Object {
    fn token(&self) -> Token<'_> {
        self.props.token()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("properties", &self.props.len())
            .finish()
    }
}

type Callable = dyn Fn(&Value, &[Value]) -> Value;

/// Callable value. Receives `this` and the argument list.
#[derive(Clone)]
pub struct Function(Rc<Callable>);

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Value + 'static,
    {
        Function(Rc::new(f))
    }

    pub fn call(&self, this: &Value, args: &[Value]) -> Value {
        (self.0)(this, args)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl IdentityKey for Function {
    fn token(&self) -> Token<'_> {
        address_token(Rc::as_ptr(&self.0))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[Function]")
    }
}

//! Script-facing binding for the containers.
//!
//! A [`Realm`] exposes the Map and Set constructors and their `forEach`
//! methods with dynamic arguments. This is where the checks that the typed
//! API makes unnecessary happen: constructing without `new` and passing a
//! non-callable callback.

use crate::error::{Error, Result};
use crate::ordered_map::OrderedMap;
use crate::ordered_set::OrderedSet;
use crate::value::{Function, Object, Value};

/// Map whose keys and values are script values.
pub type ScriptMap = OrderedMap<Value, Value>;

/// Set of script values.
pub type ScriptSet = OrderedSet<Value>;

/// How a constructor was reached.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    /// `new Map(...)`
    Construct,
    /// `Map(...)`
    Call,
}

/// What a callback sees as `this` when no `thisArg` is supplied.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum UnboundThis {
    /// Strict-mode behaviour.
    #[default]
    Undefined,
    /// Sloppy-mode behaviour: the realm's global object.
    Global,
}

#[derive(Debug, Default)]
pub struct Realm {
    global: Object,
    unbound_this: UnboundThis,
}

impl Realm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unbound_this(mut self, policy: UnboundThis) -> Self {
        self.unbound_this = policy;
        self
    }

    pub fn with_global(mut self, global: Object) -> Self {
        self.global = global;
        self
    }

    pub fn global(&self) -> &Object {
        &self.global
    }

    pub fn unbound_this(&self) -> UnboundThis {
        self.unbound_this
    }

    /// `new Map(entries)`. Later duplicates overwrite earlier ones in place.
    pub fn construct_map<I>(&self, invocation: Invocation, entries: I) -> Result<ScriptMap>
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        constructing(invocation, "Map")?;
        Ok(entries.into_iter().collect())
    }

    /// `new Set(values)`.
    pub fn construct_set<I>(&self, invocation: Invocation, values: I) -> Result<ScriptSet>
    where
        I: IntoIterator<Item = Value>,
    {
        constructing(invocation, "Set")?;
        Ok(values.into_iter().collect())
    }

    /// `map.forEach(callback, thisArg)`: calls
    /// `callback.call(this, value, key, map)` per entry. The callback may
    /// mutate `map`.
    pub fn map_for_each(
        &self,
        map: &ScriptMap,
        callback: &Value,
        this_arg: Option<&Value>,
    ) -> Result<()> {
        let f = callable(callback)?;
        let this = self.bind_this(this_arg);
        map.for_each(|v, k, m| {
            f.call(&this, &[v, k, Value::Map(m.clone())]);
        });
        Ok(())
    }

    /// `set.forEach(callback, thisArg)`: calls
    /// `callback.call(this, value, value, set)` per element.
    pub fn set_for_each(
        &self,
        set: &ScriptSet,
        callback: &Value,
        this_arg: Option<&Value>,
    ) -> Result<()> {
        let f = callable(callback)?;
        let this = self.bind_this(this_arg);
        set.for_each(|a, b, s| {
            f.call(&this, &[a, b, Value::Set(s.clone())]);
        });
        Ok(())
    }

    fn bind_this(&self, this_arg: Option<&Value>) -> Value {
        match this_arg {
            Some(v) if !v.is_undefined() => v.clone(),
            _ => match self.unbound_this {
                UnboundThis::Undefined => Value::Undefined,
                UnboundThis::Global => Value::Object(self.global.clone()),
            },
        }
    }
}

fn constructing(invocation: Invocation, type_name: &'static str) -> Result<()> {
    match invocation {
        Invocation::Construct => Ok(()),
        Invocation::Call => {
            tracing::debug!(type_name, "constructor invoked without construction");
            Err(Error::Construction { type_name })
        }
    }
}

fn callable(callback: &Value) -> Result<&Function> {
    callback.as_function().ok_or_else(|| {
        tracing::debug!(kind = callback.type_of(), "forEach given a non-callable callback");
        Error::InvalidArgument {
            argument: "callback",
            expected: "a callable function",
        }
    })
}

//! IdentityKey: derives the lookup token used by the entry index.
//!
//! A token is a small, hashable description of "which key is this". Two keys
//! map to the same entry exactly when their tokens are equal:
//! - Primitives (strings, numbers, booleans, unit) compare by value. The
//!   token variant carries the type tag, so `"1"` and `1` never collide.
//! - Floating point keys follow SameValueZero: `+0.0` and `-0.0` share a
//!   token, and every NaN shares a single token.
//! - Reference keys (`Rc<T>`, `Arc<T>`) compare by allocation identity. Two
//!   distinct allocations with identical contents are distinct keys.
//!
//! Token derivation is pure: it never mutates the key. A stored reference
//! key keeps its allocation alive, so no other live allocation can present
//! the same address while the entry exists.

use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;

/// Lookup token derived from a key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token<'a> {
    Undefined,
    Null,
    Bool(bool),
    /// Normalised `f64` bit pattern; see [`number_bits`].
    Number(u64),
    Int(i128),
    Char(char),
    Str(&'a str),
    /// Address of a shared allocation.
    Ref(usize),
}

/// Types usable as keys of [`OrderedMap`](crate::OrderedMap) and
/// [`OrderedSet`](crate::OrderedSet).
///
/// Implementations must be consistent: a key's token never changes while the
/// key is stored. Lookups take any `Q: IdentityKey`, so a map keyed by
/// `String` can be looked up with `&str`, since both produce `Token::Str`.
pub trait IdentityKey {
    fn token(&self) -> Token<'_>;

    /// The form a map stores when this key is first inserted. Number keys
    /// fold `-0.0` into `+0.0`; everything else is stored as given.
    fn canonical(self) -> Self
    where
        Self: Sized,
    {
        self
    }
}

/// Bit pattern for a number key with `-0.0` folded into `+0.0` and all NaNs
/// folded into the canonical NaN.
#[inline]
pub fn number_bits(n: f64) -> u64 {
    if n == 0.0 {
        0
    } else if n.is_nan() {
        f64::NAN.to_bits()
    } else {
        n.to_bits()
    }
}

/// Identity token for a pointer, metadata discarded.
#[inline]
pub(crate) fn address_token<T: ?Sized>(ptr: *const T) -> Token<'static> {
    Token::Ref(ptr as *const () as usize)
}

impl<T: ?Sized + IdentityKey> IdentityKey for &T {
    #[inline]
    fn token(&self) -> Token<'_> {
        (**self).token()
    }
}

impl IdentityKey for str {
    #[inline]
    fn token(&self) -> Token<'_> {
        Token::Str(self)
    }
}

impl IdentityKey for String {
    #[inline]
    fn token(&self) -> Token<'_> {
        Token::Str(self.as_str())
    }
}

impl IdentityKey for Box<str> {
    #[inline]
    fn token(&self) -> Token<'_> {
        Token::Str(self)
    }
}

impl IdentityKey for Cow<'_, str> {
    #[inline]
    fn token(&self) -> Token<'_> {
        Token::Str(self.as_ref())
    }
}

impl IdentityKey for () {
    #[inline]
    fn token(&self) -> Token<'_> {
        Token::Null
    }
}

impl IdentityKey for bool {
    #[inline]
    fn token(&self) -> Token<'_> {
        Token::Bool(*self)
    }
}

impl IdentityKey for char {
    #[inline]
    fn token(&self) -> Token<'_> {
        Token::Char(*self)
    }
}

impl IdentityKey for f64 {
    #[inline]
    fn token(&self) -> Token<'_> {
        Token::Number(number_bits(*self))
    }

    #[inline]
    fn canonical(self) -> Self {
        if self == 0.0 {
            0.0
        } else {
            self
        }
    }
}

impl IdentityKey for f32 {
    #[inline]
    fn token(&self) -> Token<'_> {
        Token::Number(number_bits(f64::from(*self)))
    }

    #[inline]
    fn canonical(self) -> Self {
        if self == 0.0 {
            0.0
        } else {
            self
        }
    }
}

macro_rules! int_identity {
    ($($t:ty),* $(,)?) => {
        $(
            impl IdentityKey for $t {
                #[inline]
                fn token(&self) -> Token<'_> {
                    Token::Int(i128::from(*self))
                }
            }
        )*
    };
}

int_identity!(i8, i16, i32, i64, u8, u16, u32, u64);

impl IdentityKey for isize {
    #[inline]
    fn token(&self) -> Token<'_> {
        Token::Int(*self as i128)
    }
}

impl IdentityKey for usize {
    #[inline]
    fn token(&self) -> Token<'_> {
        Token::Int(*self as i128)
    }
}

impl<T: ?Sized> IdentityKey for Rc<T> {
    #[inline]
    fn token(&self) -> Token<'_> {
        address_token(Rc::as_ptr(self))
    }
}

impl<T: ?Sized> IdentityKey for Arc<T> {
    #[inline]
    fn token(&self) -> Token<'_> {
        address_token(Arc::as_ptr(self))
    }
}

//! Identity and one-level shallow equality.
//!
//! [`Same`] answers "is this the same value" (scalars by value, shared nodes by
//! pointer). [`ShallowEq`] is the policy store selections are compared with:
//! identical, or two records with the same keys whose values are pairwise
//! [`Same`]. Nothing below the first level is inspected, so a change hidden
//! behind a shared handle is not seen. Callers that need deep comparison opt in
//! with a custom equality function on the selector.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;

use crate::value::Value;

pub trait Same {
    fn is_same(&self, other: &Self) -> bool;
}

pub trait ShallowEq {
    fn shallow_eq(&self, other: &Self) -> bool;
}

pub fn shallow<T: ShallowEq + ?Sized>(a: &T, b: &T) -> bool {
    a.shallow_eq(b)
}

macro_rules! by_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl Same for $t {
                fn is_same(&self, other: &Self) -> bool {
                    self == other
                }
            }
            impl ShallowEq for $t {
                fn shallow_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

by_value!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    str,
    String,
);

macro_rules! by_bits {
    ($($t:ty),*) => {
        $(
            impl Same for $t {
                fn is_same(&self, other: &Self) -> bool {
                    (self.is_nan() && other.is_nan()) || self.to_bits() == other.to_bits()
                }
            }
            impl ShallowEq for $t {
                fn shallow_eq(&self, other: &Self) -> bool {
                    self.is_same(other)
                }
            }
        )*
    };
}

by_bits!(f32, f64);

impl<T: Same + ?Sized> Same for &T {
    fn is_same(&self, other: &Self) -> bool {
        (**self).is_same(*other)
    }
}

impl<T: ?Sized> Same for Rc<T> {
    fn is_same(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ShallowEq + ?Sized> ShallowEq for Rc<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other) || (**self).shallow_eq(other)
    }
}

impl<T: Same> Same for Option<T> {
    fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.is_same(b),
            _ => false,
        }
    }
}

impl<T: ShallowEq> ShallowEq for Option<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.shallow_eq(b),
            _ => false,
        }
    }
}

impl Same for Value {
    fn is_same(&self, other: &Self) -> bool {
        Value::is_same(self, other)
    }
}

impl ShallowEq for Value {
    fn shallow_eq(&self, other: &Self) -> bool {
        if self.is_same(other) {
            return true;
        }
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a.shallow_eq(b),
            (Value::Array(a), Value::Array(b)) => a.shallow_eq(b),
            _ => false,
        }
    }
}

impl<T: Same> ShallowEq for [T] {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.is_same(b))
    }
}

impl<T: Same> ShallowEq for Vec<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.as_slice().shallow_eq(other.as_slice())
    }
}

impl<K: Ord, V: Same> ShallowEq for BTreeMap<K, V> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, a)| other.get(k).is_some_and(|b| a.is_same(b)))
    }
}

impl<K: Eq + Hash, V: Same, S: BuildHasher> ShallowEq for HashMap<K, V, S> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, a)| other.get(k).is_some_and(|b| a.is_same(b)))
    }
}

macro_rules! tuple_shallow {
    ($(($($name:ident $idx:tt),+)),*) => {
        $(
            impl<$($name: Same),+> ShallowEq for ($($name,)+) {
                fn shallow_eq(&self, other: &Self) -> bool {
                    $(self.$idx.is_same(&other.$idx))&&+
                }
            }
        )*
    };
}

tuple_shallow!((A 0, B 1), (A 0, B 1, C 2), (A 0, B 1, C 2, D 3));

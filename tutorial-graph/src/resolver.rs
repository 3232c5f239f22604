//! Field resolution.
//!
//! A [`Resolver`] turns a parent value and the field's arguments into a [`Resolved`] value. Root
//! fields receive [`Resolved::Null`] as their parent; object fields receive the record their
//! parent field resolved to.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub use crate::error::FieldError;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// A record shared between the data source and the resolvers reading it.
pub type Record = Arc<dyn Any + Send + Sync>;

/// A value produced by a resolver, before it is completed against the selection set.
#[derive(Clone)]
pub enum Resolved {
    /// No value.
    Null,
    /// A scalar value.
    Leaf(Value),
    /// A record whose fields are read by the resolvers of its object type.
    Record(Record),
    /// A list of values.
    List(Vec<Resolved>),
}

impl Resolved {
    /// Wraps a record.
    pub fn record<T: Any + Send + Sync>(record: T) -> Self {
        Resolved::Record(Arc::new(record))
    }

    /// Collects values into a list.
    pub fn list<I, R>(items: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Resolved>,
    {
        Resolved::List(items.into_iter().map(Into::into).collect())
    }

    /// Borrows the record as a `T`, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Resolved::Record(record) => record.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// A short name for the kind of value, used in error messages.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Resolved::Null => "null",
            Resolved::Leaf(_) => "scalar",
            Resolved::Record(_) => "object",
            Resolved::List(_) => "list",
        }
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Null => f.write_str("Null"),
            Resolved::Leaf(value) => f.debug_tuple("Leaf").field(value).finish(),
            Resolved::Record(_) => f.write_str("Record(..)"),
            Resolved::List(items) => f.debug_tuple("List").field(items).finish(),
        }
    }
}

macro_rules! leaf_from {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Resolved {
                fn from(value: $ty) -> Self {
                    Resolved::Leaf(Value::from(value))
                }
            }
        )+
    };
}

leaf_from!(i32, i64, f64, bool, String, &str);

impl From<Value> for Resolved {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Resolved::Null,
            value => Resolved::Leaf(value),
        }
    }
}

impl<T: Into<Resolved>> From<Option<T>> for Resolved {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Resolved::Null)
    }
}

impl<T: Into<Resolved>> From<Vec<T>> for Resolved {
    fn from(items: Vec<T>) -> Self {
        Resolved::list(items)
    }
}

/// Resolves the value of one field.
///
/// Resolvers never mutate the data they read.
pub trait Resolver: Send + Sync {
    fn resolve(&self, parent: &Resolved, arguments: &Object) -> Result<Resolved, FieldError>;
}

impl<F> Resolver for F
where
    F: Fn(&Resolved, &Object) -> Result<Resolved, FieldError> + Send + Sync,
{
    fn resolve(&self, parent: &Resolved, arguments: &Object) -> Result<Resolved, FieldError> {
        self(parent, arguments)
    }
}

type Projection = dyn Fn(&(dyn Any + Send + Sync)) -> Option<Resolved> + Send + Sync;

/// A field-projection resolver: reads one attribute off a parent record of type `T`.
///
/// Built by [`crate::spec::ObjectType::builder`] for every field declared with an accessor.
#[derive(Clone)]
pub struct Accessor {
    expected: &'static str,
    project: Arc<Projection>,
}

impl Accessor {
    pub fn new<T, F>(accessor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> Resolved + Send + Sync + 'static,
    {
        Accessor {
            expected: std::any::type_name::<T>(),
            project: Arc::new(move |record: &(dyn Any + Send + Sync)| {
                record.downcast_ref::<T>().map(&accessor)
            }),
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("expected", &self.expected)
            .finish()
    }
}

impl Resolver for Accessor {
    fn resolve(&self, parent: &Resolved, _arguments: &Object) -> Result<Resolved, FieldError> {
        let projected = match parent {
            Resolved::Record(record) => (self.project)(record.as_ref()),
            _ => None,
        };
        projected.ok_or_else(|| FieldError::InvalidParent {
            expected: self.expected.to_string(),
        })
    }
}

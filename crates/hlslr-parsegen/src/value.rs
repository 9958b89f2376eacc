//! Closed set of parse values.
//!
//! A grammar works over one enum `V` that has a variant per semantic value
//! type. Values are erased into `V` when pushed on the engine's stack and
//! restored to their concrete type when a production consumes them. Each
//! member type carries its kind as an associated constant, which is how the
//! grammar builder derives symbols from plain function signatures.

use std::fmt;
use std::hash::Hash;

/// The enum holding every value a grammar can produce.
pub trait ValueSet: Sized + fmt::Debug + 'static {
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

/// A member type of the value set `V`.
pub trait Typed<V: ValueSet>: Sized + 'static {
    const KIND: V::Kind;

    fn erase(self) -> V;

    /// Gives the value back unchanged when it holds a different kind.
    fn restore(value: V) -> Result<Self, V>;
}

/// Declares a value set and its kind enum, and implements [`Typed`] for every
/// member type.
///
/// ```ignore
/// value_set! {
///     pub enum Node: NodeKind {
///         Number(Number),
///         Sum(Sum),
///     }
/// }
/// ```
///
/// Listing the same type twice fails to compile, so the mapping from types to
/// kinds is always one to one.
#[macro_export]
macro_rules! value_set {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $kind:ident {
            $( $variant:ident ( $ty:ty ) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        $vis enum $name {
            $( $variant($ty), )+
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $kind {
            $( $variant, )+
        }

        impl $crate::ValueSet for $name {
            type Kind = $kind;

            fn kind(&self) -> $kind {
                match self {
                    $( $name::$variant(_) => $kind::$variant, )+
                }
            }
        }

        $(
            impl $crate::Typed<$name> for $ty {
                const KIND: $kind = $kind::$variant;

                fn erase(self) -> $name {
                    $name::$variant(self)
                }

                #[allow(unreachable_patterns)]
                fn restore(value: $name) -> ::std::result::Result<Self, $name> {
                    match value {
                        $name::$variant(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }
        )+
    };
}

//! Symbolic references to fields and methods.
//!
//! A [`MemberRef`] names a member by its declaring class plus a [`NameAndType`] pair, the
//! same way the constant pool does. Both are value types with structural equality so they
//! can key hash maps.

use std::fmt;

use crate::classfile::Type;

/// A member name paired with its descriptor type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameAndType {
    name: String,
    ty: Type,
}

impl NameAndType {
    /// Create a new name and type pair.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        NameAndType {
            name: name.into(),
            ty,
        }
    }

    /// The member name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The member's descriptor type.
    #[must_use]
    pub fn ty(&self) -> &Type {
        &self.ty
    }
}

impl fmt::Display for NameAndType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.ty)
    }
}

/// Reference to a field or method of a class.
///
/// Two references are equal exactly when their declaring classes and name/type pairs are
/// equal.
///
/// # Examples
///
/// ```rust
/// use classscope::classfile::{MemberRef, NameAndType, Type};
///
/// let length = MemberRef::new(
///     Type::object("java/lang/String"),
///     NameAndType::new("length", Type::parse("()I")?),
/// );
/// assert!(length.is_method());
/// assert_eq!(length.to_string(), "<Method java/lang/String.length ()I>");
/// # Ok::<(), classscope::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    declaring_class: Type,
    name_and_type: NameAndType,
}

impl MemberRef {
    /// Create a reference to a member of `declaring_class`.
    #[must_use]
    pub fn new(declaring_class: Type, name_and_type: NameAndType) -> Self {
        MemberRef {
            declaring_class,
            name_and_type,
        }
    }

    /// The class declaring the member.
    #[must_use]
    pub fn declaring_class(&self) -> &Type {
        &self.declaring_class
    }

    /// The member name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name_and_type.name()
    }

    /// The member's descriptor type.
    #[must_use]
    pub fn ty(&self) -> &Type {
        self.name_and_type.ty()
    }

    /// The name and type pair.
    #[must_use]
    pub fn name_and_type(&self) -> &NameAndType {
        &self.name_and_type
    }

    /// Returns `true` if this references a method rather than a field.
    #[must_use]
    pub fn is_method(&self) -> bool {
        self.ty().is_method()
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_method() { "Method" } else { "Field" };
        match &self.declaring_class {
            Type::Object(name) => write!(f, "<{kind} {name}.{} {}>", self.name(), self.ty()),
            other => write!(f, "<{kind} {other}.{} {}>", self.name(), self.ty()),
        }
    }
}

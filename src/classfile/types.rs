//! JVM field and method descriptors.
//!
//! [`Type`] models the descriptor grammar of the class file format plus two analysis-only
//! types: [`Type::Address`], the value a subroutine call leaves on the stack, and
//! [`Type::Null`], the type of the `null` constant. Descriptors round-trip through
//! [`Type::parse`] and [`std::fmt::Display`].

use std::fmt;

use crate::Result;

/// A JVM value or method type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// `Z`
    Boolean,
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `S`
    Short,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `D`
    Double,
    /// `V`, only valid as a method return type
    Void,
    /// `Lpkg/Name;`, holding the internal class name
    Object(String),
    /// `[elem`
    Array(Box<Type>),
    /// `(params)ret`
    Method {
        /// Parameter types in declaration order
        params: Vec<Type>,
        /// Return type
        ret: Box<Type>,
    },
    /// Return address pushed by a subroutine call
    Address,
    /// Type of the `null` literal
    Null,
}

impl Type {
    /// Build an object type from an internal class name such as `java/lang/String`.
    #[must_use]
    pub fn object(name: impl Into<String>) -> Self {
        Type::Object(name.into())
    }

    /// Build an array type with the given element type.
    #[must_use]
    pub fn array(elem: Type) -> Self {
        Type::Array(Box::new(elem))
    }

    /// Parse a field or method descriptor.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `descriptor` is not a complete, well-formed
    /// descriptor.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let bytes = descriptor.as_bytes();
        let mut pos = 0;
        let ty = if bytes.first() == Some(&b'(') {
            parse_method(bytes, &mut pos)?
        } else {
            parse_value(bytes, &mut pos, true)?
        };

        if pos != bytes.len() {
            return Err(malformed_error!(
                "Trailing characters in descriptor '{}' at {}",
                descriptor,
                pos
            ));
        }
        Ok(ty)
    }

    /// Returns `true` for method types.
    #[must_use]
    pub fn is_method(&self) -> bool {
        matches!(self, Type::Method { .. })
    }

    /// Returns `true` for the two-slot types `long` and `double`.
    #[must_use]
    pub fn is_wide(&self) -> bool {
        matches!(self, Type::Long | Type::Double)
    }

    /// Returns `true` for class, array and null types.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Object(_) | Type::Array(_) | Type::Null)
    }

    /// Number of local variable or operand stack slots a value of this type occupies.
    ///
    /// `void` and method types occupy none.
    #[must_use]
    pub fn slot_size(&self) -> usize {
        match self {
            Type::Void | Type::Method { .. } => 0,
            Type::Long | Type::Double => 2,
            _ => 1,
        }
    }

    /// Return type of a method type.
    #[must_use]
    pub fn return_type(&self) -> Option<&Type> {
        match self {
            Type::Method { ret, .. } => Some(ret),
            _ => None,
        }
    }

    /// Parameter types of a method type; empty for value types.
    #[must_use]
    pub fn param_types(&self) -> &[Type] {
        match self {
            Type::Method { params, .. } => params,
            _ => &[],
        }
    }

    /// Element type of an array type.
    #[must_use]
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(elem) => Some(elem),
            _ => None,
        }
    }
}

fn parse_method(bytes: &[u8], pos: &mut usize) -> Result<Type> {
    // Skip '('
    *pos += 1;
    let mut params = Vec::new();
    loop {
        match bytes.get(*pos) {
            Some(b')') => {
                *pos += 1;
                break;
            }
            Some(_) => params.push(parse_value(bytes, pos, false)?),
            None => return Err(malformed_error!("Unterminated parameter list in descriptor")),
        }
    }

    let ret = parse_value(bytes, pos, true)?;
    Ok(Type::Method {
        params,
        ret: Box::new(ret),
    })
}

fn parse_value(bytes: &[u8], pos: &mut usize, allow_void: bool) -> Result<Type> {
    let Some(&tag) = bytes.get(*pos) else {
        return Err(malformed_error!("Descriptor ends where a type was expected"));
    };
    *pos += 1;

    let ty = match tag {
        b'Z' => Type::Boolean,
        b'B' => Type::Byte,
        b'C' => Type::Char,
        b'S' => Type::Short,
        b'I' => Type::Int,
        b'J' => Type::Long,
        b'F' => Type::Float,
        b'D' => Type::Double,
        b'V' if allow_void => Type::Void,
        b'L' => {
            let start = *pos;
            let Some(len) = bytes[start..].iter().position(|&b| b == b';') else {
                return Err(malformed_error!("Unterminated class name in descriptor"));
            };
            if len == 0 {
                return Err(malformed_error!("Empty class name in descriptor"));
            }
            *pos = start + len + 1;
            let name = std::str::from_utf8(&bytes[start..start + len])
                .map_err(|_| malformed_error!("Class name is not valid UTF-8"))?;
            Type::Object(name.to_string())
        }
        b'[' => Type::Array(Box::new(parse_value(bytes, pos, false)?)),
        other => {
            return Err(malformed_error!(
                "Invalid descriptor character '{}' at {}",
                char::from(other),
                *pos - 1
            ))
        }
    };
    Ok(ty)
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Boolean => write!(f, "Z"),
            Type::Byte => write!(f, "B"),
            Type::Char => write!(f, "C"),
            Type::Short => write!(f, "S"),
            Type::Int => write!(f, "I"),
            Type::Long => write!(f, "J"),
            Type::Float => write!(f, "F"),
            Type::Double => write!(f, "D"),
            Type::Void => write!(f, "V"),
            Type::Object(name) => write!(f, "L{name};"),
            Type::Array(elem) => write!(f, "[{elem}"),
            Type::Method { params, ret } => {
                write!(f, "(")?;
                for param in params {
                    write!(f, "{param}")?;
                }
                write!(f, "){ret}")
            }
            Type::Address => write!(f, "<address>"),
            Type::Null => write!(f, "<null>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_parse_primitives() {
        assert_eq!(Type::parse("I").unwrap(), Type::Int);
        assert_eq!(Type::parse("J").unwrap(), Type::Long);
        assert_eq!(Type::parse("V").unwrap(), Type::Void);
    }

    #[test]
    fn test_parse_object_and_array() {
        let ty = Type::parse("[[Ljava/lang/String;").unwrap();
        assert_eq!(
            ty,
            Type::array(Type::array(Type::object("java/lang/String")))
        );
        assert!(ty.is_reference());
        assert_eq!(ty.to_string(), "[[Ljava/lang/String;");
    }

    #[test]
    fn test_parse_method() {
        let ty = Type::parse("(IJ[BLjava/lang/Object;)V").unwrap();
        assert!(ty.is_method());
        assert_eq!(ty.param_types().len(), 4);
        assert_eq!(ty.param_types()[1], Type::Long);
        assert_eq!(ty.return_type(), Some(&Type::Void));
        assert_eq!(ty.slot_size(), 0);
        assert_eq!(ty.to_string(), "(IJ[BLjava/lang/Object;)V");
    }

    #[test]
    fn test_slot_sizes() {
        assert_eq!(Type::Int.slot_size(), 1);
        assert_eq!(Type::Double.slot_size(), 2);
        assert!(Type::Long.is_wide());
        assert!(!Type::Address.is_wide());
        assert_eq!(Type::Address.slot_size(), 1);
    }

    #[test]
    fn test_parse_malformed() {
        for bad in ["", "Q", "(I", "Ljava/lang/String", "L;", "[V", "(V)V", "II", "(I)"] {
            assert!(
                matches!(Type::parse(bad), Err(Error::Malformed { .. })),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn test_display_analysis_types() {
        assert_eq!(Type::Address.to_string(), "<address>");
        assert_eq!(Type::Null.to_string(), "<null>");
    }
}

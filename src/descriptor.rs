//! Field and method descriptor grammar.
//!
//! ```text
//! FieldType  := BaseType | 'L' ClassName ';' | '['+ FieldType
//! BaseType   := 'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z'
//! Method     := '(' FieldType* ')' ( FieldType | 'V' )
//! ```

use std::fmt;

use serde::Serialize;

use crate::constant_pool::to_dotted;
use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl Primitive {
    pub fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'B' => Primitive::Byte,
            'C' => Primitive::Char,
            'D' => Primitive::Double,
            'F' => Primitive::Float,
            'I' => Primitive::Int,
            'J' => Primitive::Long,
            'S' => Primitive::Short,
            'Z' => Primitive::Boolean,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Double => "double",
            Primitive::Float => "float",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Short => "short",
            Primitive::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDescriptor {
    Primitive { primitive: Primitive },
    Object { name: String },
    Array { element: Box<TypeDescriptor>, depth: u8 },
    /// Only ever produced as a method return type.
    Void,
}

impl TypeDescriptor {
    pub fn primitive(primitive: Primitive) -> Self {
        TypeDescriptor::Primitive { primitive }
    }

    pub fn object(name: impl Into<String>) -> Self {
        TypeDescriptor::Object { name: name.into() }
    }

    pub fn array(element: TypeDescriptor, depth: u8) -> Self {
        debug_assert!(depth >= 1);
        debug_assert!(!matches!(element, TypeDescriptor::Array { .. } | TypeDescriptor::Void));
        TypeDescriptor::Array {
            element: Box::new(element),
            depth,
        }
    }

    /// The class this type mentions, looking through arrays.
    pub fn object_name(&self) -> Option<&str> {
        match self {
            TypeDescriptor::Object { name } => Some(name),
            TypeDescriptor::Array { element, .. } => element.object_name(),
            _ => None,
        }
    }

    /// For an array, the type one dimension down.
    pub fn component_type(&self) -> Option<TypeDescriptor> {
        match self {
            TypeDescriptor::Array { element, depth: 1 } => Some((**element).clone()),
            TypeDescriptor::Array { element, depth } => Some(TypeDescriptor::Array {
                element: element.clone(),
                depth: depth - 1,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive { primitive } => f.write_str(primitive.name()),
            TypeDescriptor::Object { name } => f.write_str(name),
            TypeDescriptor::Array { element, depth } => {
                write!(f, "{element}")?;
                for _ in 0..*depth {
                    f.write_str("[]")?;
                }
                Ok(())
            }
            TypeDescriptor::Void => f.write_str("void"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSignature {
    pub parameters: Vec<TypeDescriptor>,
    pub return_type: TypeDescriptor,
}

pub fn parse_field_descriptor(descriptor: &str) -> Result<TypeDescriptor, ParseError> {
    let mut scanner = Scanner::new(descriptor);
    let field_type = scanner.field_type()?;
    scanner.finish()?;
    Ok(field_type)
}

pub fn parse_method_descriptor(descriptor: &str) -> Result<MethodSignature, ParseError> {
    let mut scanner = Scanner::new(descriptor);
    scanner.expect('(')?;

    let mut parameters = Vec::new();
    loop {
        match scanner.peek() {
            Some(')') => {
                scanner.bump();
                break;
            }
            Some(_) => parameters.push(scanner.field_type()?),
            None => return Err(scanner.error("missing `)` after parameters")),
        }
    }

    let return_type = if scanner.peek() == Some('V') {
        scanner.bump();
        TypeDescriptor::Void
    } else {
        scanner.field_type()?
    };
    scanner.finish()?;

    Ok(MethodSignature {
        parameters,
        return_type,
    })
}

struct Scanner<'a> {
    descriptor: &'a str,
    position: usize,
}

impl<'a> Scanner<'a> {
    fn new(descriptor: &'a str) -> Self {
        Self {
            descriptor,
            position: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.descriptor[self.position..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            _ => Err(self.error(&format!("expected `{expected}` at offset {}", self.position))),
        }
    }

    fn finish(&self) -> Result<(), ParseError> {
        if self.position == self.descriptor.len() {
            Ok(())
        } else {
            Err(self.error(&format!("unexpected trailing input at offset {}", self.position)))
        }
    }

    fn error(&self, reason: &str) -> ParseError {
        ParseError::descriptor(self.descriptor, reason)
    }

    fn field_type(&mut self) -> Result<TypeDescriptor, ParseError> {
        let mut depth: u8 = 0;
        while self.peek() == Some('[') {
            self.bump();
            depth = depth
                .checked_add(1)
                .ok_or_else(|| self.error("array has more than 255 dimensions"))?;
        }

        let base = match self.bump() {
            Some('L') => {
                let rest = &self.descriptor[self.position..];
                let end = rest
                    .find(';')
                    .ok_or_else(|| self.error("object type is missing its `;`"))?;
                if end == 0 {
                    return Err(self.error("object type has an empty class name"));
                }
                let name = to_dotted(&rest[..end]);
                self.position += end + 1;
                TypeDescriptor::Object { name }
            }
            Some(code) => match Primitive::from_code(code) {
                Some(primitive) => TypeDescriptor::Primitive { primitive },
                None => {
                    return Err(self.error(&format!("unknown type code `{code}`")));
                }
            },
            None if depth > 0 => return Err(self.error("array without an element type")),
            None => return Err(self.error("expected a type")),
        };

        Ok(if depth == 0 {
            base
        } else {
            TypeDescriptor::array(base, depth)
        })
    }
}

//! Error types for class decoding and model queries.

use thiserror::Error;

use crate::constant_pool::ConstantTag;

/// A class file that cannot be decoded.
///
/// Any of these is fatal for the one class file being decoded and never for
/// its siblings.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("bad magic: expected 0xCAFEBABE, found 0x{0:08X}")]
    BadMagic(u32),

    #[error("unexpected end of class data at offset {offset} (needed {needed} more bytes)")]
    Truncated { offset: usize, needed: usize },

    #[error("{0} trailing bytes after the class attribute table")]
    TrailingBytes(usize),

    #[error("unknown constant pool tag {tag} in slot {index}")]
    UnknownTag { index: u16, tag: u8 },

    #[error("constant pool index {index} is not addressable (pool size {size})")]
    InvalidIndex { index: u16, size: u16 },

    #[error("constant pool slot {index} is {found:?}, expected {expected}")]
    UnexpectedTag {
        index: u16,
        found: ConstantTag,
        expected: &'static str,
    },

    #[error("constant pool slot {index} holds malformed modified UTF-8")]
    Utf8 { index: u16 },

    #[error("malformed type descriptor `{descriptor}`: {reason}")]
    Descriptor { descriptor: String, reason: String },

    #[error("attribute `{name}` declares {declared} bytes but its contents need {actual}")]
    AttributeLength {
        name: String,
        declared: u32,
        actual: u32,
    },

    #[error("class `{0}` has no super class")]
    MissingSuperClass(String),

    #[error("failed to read class data: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    pub(crate) fn descriptor(descriptor: &str, reason: impl Into<String>) -> Self {
        ParseError::Descriptor {
            descriptor: descriptor.to_string(),
            reason: reason.into(),
        }
    }
}

/// Misuse of the package/component/group model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("class `{class}` already exists in package `{package}`")]
    DuplicateClass { package: String, class: String },

    #[error("class `{class}` belongs to package `{actual}`, not `{expected}`")]
    PackageMismatch {
        class: String,
        expected: String,
        actual: String,
    },

    #[error("component `{0}` appears more than once in the group")]
    DuplicateComponent(String),

    #[error("unknown component `{0}`")]
    UnknownComponent(String),

    #[error("unknown package `{package}` in component `{component}`")]
    UnknownPackage { component: String, package: String },

    #[error("unknown class `{class}` in {scope}")]
    UnknownClass { scope: String, class: String },

    #[error("filter `{filter}` can never match a {granularity} dependency")]
    UnsatisfiableFilter {
        filter: String,
        granularity: &'static str,
    },
}

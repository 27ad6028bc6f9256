//! Constant pool table of one class file.
//!
//! Slots are addressed from 1. A long or double literal occupies its own slot
//! and the one after it; that second slot is stored as a hole and any lookup
//! of it fails.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::ParseError;
use crate::reader::{ClassReader, decode_modified_utf8};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstantTag {
    Utf8,
    Integer,
    Float,
    Long,
    Double,
    Class,
    String,
    FieldRef,
    MethodRef,
    InterfaceMethodRef,
    NameAndType,
    MethodHandle,
    MethodType,
    Dynamic,
    InvokeDynamic,
    Module,
    Package,
}

impl ConstantTag {
    pub fn from_byte(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => ConstantTag::Utf8,
            3 => ConstantTag::Integer,
            4 => ConstantTag::Float,
            5 => ConstantTag::Long,
            6 => ConstantTag::Double,
            7 => ConstantTag::Class,
            8 => ConstantTag::String,
            9 => ConstantTag::FieldRef,
            10 => ConstantTag::MethodRef,
            11 => ConstantTag::InterfaceMethodRef,
            12 => ConstantTag::NameAndType,
            15 => ConstantTag::MethodHandle,
            16 => ConstantTag::MethodType,
            17 => ConstantTag::Dynamic,
            18 => ConstantTag::InvokeDynamic,
            19 => ConstantTag::Module,
            20 => ConstantTag::Package,
            _ => return None,
        })
    }

    /// Long and double entries take two slots.
    pub fn is_wide(self) -> bool {
        matches!(self, ConstantTag::Long | ConstantTag::Double)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstantValue {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstantPoolEntry {
    pub tag: ConstantTag,
    pub value: Option<ConstantValue>,
    /// Class, string, module and package entries point at their UTF8 name;
    /// member references at their class; name-and-type at its name.
    pub name_index: Option<u16>,
    /// Member references point at their name-and-type; name-and-type and
    /// method-type entries at their descriptor.
    pub type_index: Option<u16>,
}

impl ConstantPoolEntry {
    fn literal(tag: ConstantTag, value: ConstantValue) -> Self {
        Self {
            tag,
            value: Some(value),
            name_index: None,
            type_index: None,
        }
    }

    fn reference(tag: ConstantTag, name_index: Option<u16>, type_index: Option<u16>) -> Self {
        Self {
            tag,
            value: None,
            name_index,
            type_index,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConstantPool {
    /// `slots[0]` and the shadow slot of every wide entry stay `None`.
    slots: Vec<Option<ConstantPoolEntry>>,
}

impl ConstantPool {
    pub fn read(reader: &mut ClassReader<'_>) -> Result<Self, ParseError> {
        let count = reader.read_u16()?;
        let mut slots: Vec<Option<ConstantPoolEntry>> = vec![None; count.max(1) as usize];

        // Wider than the slot type: a wide entry in slot 65534 steps past u16.
        let mut index: u32 = 1;
        while index < u32::from(count) {
            let entry = read_entry(reader, index as u16)?;
            let wide = entry.tag.is_wide();
            slots[index as usize] = Some(entry);
            index += if wide { 2 } else { 1 };
        }
        // A wide entry in the last slot would spill past the declared size.
        if index > u32::from(count) {
            return Err(ParseError::InvalidIndex {
                index: (index - 1) as u16,
                size: count,
            });
        }

        Ok(Self { slots })
    }

    /// Number of slots including the unused slot 0, as declared in the file.
    pub fn size(&self) -> u16 {
        self.slots.len() as u16
    }

    pub fn get(&self, index: u16) -> Result<&ConstantPoolEntry, ParseError> {
        self.slots
            .get(index as usize)
            .and_then(Option::as_ref)
            .ok_or(ParseError::InvalidIndex {
                index,
                size: self.size(),
            })
    }

    pub fn entries(&self) -> impl Iterator<Item = (u16, &ConstantPoolEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|e| (i as u16, e)))
    }

    /// Raw UTF8 value at `index`.
    pub fn utf8(&self, index: u16) -> Result<&str, ParseError> {
        let entry = self.get(index)?;
        match &entry.value {
            Some(ConstantValue::Utf8(value)) => Ok(value),
            _ => Err(ParseError::UnexpectedTag {
                index,
                found: entry.tag,
                expected: "Utf8",
            }),
        }
    }

    /// Resolves `index` as a UTF8 entry and returns it in dotted form.
    pub fn resolve_direct(&self, index: u16) -> Result<String, ParseError> {
        Ok(to_dotted(self.utf8(index)?))
    }

    /// Resolves `index` to an entry, follows its name index to a UTF8 entry,
    /// and returns that value in dotted form.
    pub fn resolve_indirect(&self, index: u16) -> Result<String, ParseError> {
        let entry = self.get(index)?;
        let name_index = entry.name_index.ok_or(ParseError::UnexpectedTag {
            index,
            found: entry.tag,
            expected: "an entry with a name index",
        })?;
        self.resolve_direct(name_index)
    }

    /// Indirect resolution that additionally requires a class entry.
    pub fn class_name(&self, index: u16) -> Result<String, ParseError> {
        let entry = self.get(index)?;
        if entry.tag != ConstantTag::Class {
            return Err(ParseError::UnexpectedTag {
                index,
                found: entry.tag,
                expected: "Class",
            });
        }
        self.resolve_indirect(index)
    }

    /// Every class referenced by the pool, skipping array types.
    pub fn class_names(&self) -> Result<BTreeSet<String>, ParseError> {
        let mut names = BTreeSet::new();
        for (index, entry) in self.entries() {
            if entry.tag != ConstantTag::Class {
                continue;
            }
            let name = self.resolve_indirect(index)?;
            if !name.starts_with('[') {
                names.insert(name);
            }
        }
        Ok(names)
    }
}

pub(crate) fn to_dotted(name: &str) -> String {
    name.replace('/', ".")
}

fn read_entry(reader: &mut ClassReader<'_>, index: u16) -> Result<ConstantPoolEntry, ParseError> {
    let raw_tag = reader.read_u8()?;
    let tag = ConstantTag::from_byte(raw_tag).ok_or(ParseError::UnknownTag {
        index,
        tag: raw_tag,
    })?;

    let entry = match tag {
        ConstantTag::Utf8 => {
            let len = reader.read_u16()? as usize;
            let bytes = reader.read_bytes(len)?;
            let value = decode_modified_utf8(bytes).ok_or(ParseError::Utf8 { index })?;
            ConstantPoolEntry::literal(tag, ConstantValue::Utf8(value))
        }
        ConstantTag::Integer => {
            ConstantPoolEntry::literal(tag, ConstantValue::Integer(reader.read_u32()? as i32))
        }
        ConstantTag::Float => ConstantPoolEntry::literal(
            tag,
            ConstantValue::Float(f32::from_bits(reader.read_u32()?)),
        ),
        ConstantTag::Long => {
            ConstantPoolEntry::literal(tag, ConstantValue::Long(reader.read_u64()? as i64))
        }
        ConstantTag::Double => ConstantPoolEntry::literal(
            tag,
            ConstantValue::Double(f64::from_bits(reader.read_u64()?)),
        ),
        ConstantTag::Class
        | ConstantTag::String
        | ConstantTag::Module
        | ConstantTag::Package => {
            ConstantPoolEntry::reference(tag, Some(reader.read_u16()?), None)
        }
        ConstantTag::MethodType => ConstantPoolEntry::reference(tag, None, Some(reader.read_u16()?)),
        ConstantTag::FieldRef
        | ConstantTag::MethodRef
        | ConstantTag::InterfaceMethodRef
        | ConstantTag::NameAndType
        | ConstantTag::Dynamic
        | ConstantTag::InvokeDynamic => {
            let first = reader.read_u16()?;
            let second = reader.read_u16()?;
            ConstantPoolEntry::reference(tag, Some(first), Some(second))
        }
        ConstantTag::MethodHandle => {
            let kind = reader.read_u8()?;
            let reference = reader.read_u16()?;
            ConstantPoolEntry {
                tag,
                value: Some(ConstantValue::Integer(kind as i32)),
                name_index: Some(reference),
                type_index: None,
            }
        }
    };
    Ok(entry)
}

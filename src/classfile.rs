//! Class file decoding into [`ClassDescriptor`]s.
//!
//! Only the symbolic surface of a class is recovered: its name, hierarchy,
//! members and every class it mentions. Method bodies are skipped.

use std::collections::BTreeSet;
use std::io::Read;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::constant_pool::ConstantPool;
use crate::descriptor::{TypeDescriptor, parse_field_descriptor, parse_method_descriptor};
use crate::error::ParseError;
use crate::reader::ClassReader;

pub const MAGIC: u32 = 0xCAFEBABE;

const ROOT_CLASS: &str = "java.lang.Object";
const EXCEPTIONS_ATTRIBUTE: &str = "Exceptions";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ClassAccess: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct FieldAccess: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct MethodAccess: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassType {
    Class,
    AbstractClass,
    Interface,
    Annotation,
    Enumeration,
    /// Known only by name, never decoded.
    ExternalClass,
}

impl ClassType {
    /// Annotations carry the interface bit and interfaces carry the abstract
    /// bit, so the checks must run in this order.
    pub fn from_access(access: ClassAccess) -> Self {
        if access.contains(ClassAccess::ENUM) {
            ClassType::Enumeration
        } else if access.contains(ClassAccess::ANNOTATION) {
            ClassType::Annotation
        } else if access.contains(ClassAccess::INTERFACE) {
            ClassType::Interface
        } else if access.contains(ClassAccess::ABSTRACT) {
            ClassType::AbstractClass
        } else {
            ClassType::Class
        }
    }

    pub fn is_abstract(self) -> bool {
        matches!(
            self,
            ClassType::AbstractClass | ClassType::Interface | ClassType::Annotation
        )
    }

    pub fn is_instantiable(self) -> bool {
        matches!(self, ClassType::Class | ClassType::Enumeration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodType {
    Initializer,
    Constructor,
    Method,
}

impl MethodType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "<clinit>" => MethodType::Initializer,
            "<init>" => MethodType::Constructor,
            _ => MethodType::Method,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub access: FieldAccess,
    pub field_type: TypeDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodDescriptor {
    pub name: String,
    pub access: MethodAccess,
    pub parameters: Vec<TypeDescriptor>,
    pub return_type: TypeDescriptor,
    pub exceptions: Vec<String>,
    pub method_type: MethodType,
}

/// Everything a [`ClassDescriptor`] is derived from. Names are dotted.
#[derive(Debug, Clone)]
pub struct ClassParts {
    pub name: String,
    pub access: ClassAccess,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldDescriptor>,
    pub methods: Vec<MethodDescriptor>,
    /// Class references found only in the constant pool.
    pub referenced_classes: BTreeSet<String>,
}

impl ClassParts {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access: ClassAccess::PUBLIC | ClassAccess::SUPER,
            super_name: Some(ROOT_CLASS.to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            referenced_classes: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDescriptor {
    name: String,
    simple_name: String,
    package_name: String,
    super_name: Option<String>,
    interfaces: Vec<String>,
    class_type: ClassType,
    access: ClassAccess,
    inner: bool,
    anonymous: bool,
    fields: Vec<FieldDescriptor>,
    methods: Vec<MethodDescriptor>,
    imported_class_names: BTreeSet<String>,
}

impl ClassDescriptor {
    pub fn new(parts: ClassParts) -> Self {
        let ClassParts {
            name,
            access,
            super_name,
            interfaces,
            fields,
            methods,
            referenced_classes,
        } = parts;

        let (package_name, simple_name) = match name.rfind('.') {
            Some(dot) => (name[..dot].to_string(), name[dot + 1..].to_string()),
            None => (String::new(), name.clone()),
        };
        let (inner, anonymous) = match simple_name.rfind('$') {
            Some(dollar) => {
                let suffix = &simple_name[dollar + 1..];
                (
                    true,
                    !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()),
                )
            }
            None => (false, false),
        };

        let mut imports = referenced_classes;
        imports.extend(super_name.iter().cloned());
        imports.extend(interfaces.iter().cloned());
        for field in &fields {
            imports.extend(field.field_type.object_name().map(str::to_string));
        }
        for method in &methods {
            for t in method.parameters.iter().chain(std::iter::once(&method.return_type)) {
                imports.extend(t.object_name().map(str::to_string));
            }
            imports.extend(method.exceptions.iter().cloned());
        }
        imports.remove(&name);

        Self {
            class_type: ClassType::from_access(access),
            name,
            simple_name,
            package_name,
            super_name,
            interfaces,
            access,
            inner,
            anonymous,
            fields,
            methods,
            imported_class_names: imports,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn super_name(&self) -> Option<&str> {
        self.super_name.as_deref()
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub fn class_type(&self) -> ClassType {
        self.class_type
    }

    pub fn access(&self) -> ClassAccess {
        self.access
    }

    pub fn is_inner(&self) -> bool {
        self.inner
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    pub fn is_abstract(&self) -> bool {
        self.class_type.is_abstract()
    }

    pub fn is_instantiable(&self) -> bool {
        self.class_type.is_instantiable()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    pub fn imported_class_names(&self) -> &BTreeSet<String> {
        &self.imported_class_names
    }

    pub fn imports(&self, class_name: &str) -> bool {
        self.imported_class_names.contains(class_name)
    }
}

/// Package part of a dotted class name; empty for the default package.
pub fn package_of(class_name: &str) -> &str {
    class_name.rfind('.').map(|dot| &class_name[..dot]).unwrap_or("")
}

pub fn decode_from<R: Read>(mut input: R) -> Result<ClassDescriptor, ParseError> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    decode(&bytes)
}

pub fn decode(bytes: &[u8]) -> Result<ClassDescriptor, ParseError> {
    let mut reader = ClassReader::new(bytes);

    let magic = reader.read_u32()?;
    if magic != MAGIC {
        return Err(ParseError::BadMagic(magic));
    }
    let _minor = reader.read_u16()?;
    let _major = reader.read_u16()?;

    let pool = ConstantPool::read(&mut reader)?;

    let access = ClassAccess::from_bits_retain(reader.read_u16()?);
    let name = pool.class_name(reader.read_u16()?)?;
    let super_name = match reader.read_u16()? {
        0 if name == ROOT_CLASS => None,
        0 => return Err(ParseError::MissingSuperClass(name)),
        index => Some(pool.class_name(index)?),
    };
    let interface_count = reader.read_u16()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(pool.class_name(reader.read_u16()?)?);
    }

    let field_count = reader.read_u16()?;
    let mut fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        fields.push(read_field(&mut reader, &pool)?);
    }

    let method_count = reader.read_u16()?;
    let mut methods = Vec::with_capacity(method_count as usize);
    for _ in 0..method_count {
        methods.push(read_method(&mut reader, &pool)?);
    }

    skip_attributes(&mut reader)?;
    if reader.remaining() > 0 {
        return Err(ParseError::TrailingBytes(reader.remaining()));
    }

    Ok(ClassDescriptor::new(ClassParts {
        referenced_classes: pool.class_names()?,
        name,
        access,
        super_name,
        interfaces,
        fields,
        methods,
    }))
}

fn read_field(reader: &mut ClassReader<'_>, pool: &ConstantPool) -> Result<FieldDescriptor, ParseError> {
    let access = FieldAccess::from_bits_retain(reader.read_u16()?);
    let name = pool.resolve_direct(reader.read_u16()?)?;
    let field_type = parse_field_descriptor(pool.utf8(reader.read_u16()?)?)?;
    skip_attributes(reader)?;

    Ok(FieldDescriptor {
        name,
        access,
        field_type,
    })
}

fn read_method(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool,
) -> Result<MethodDescriptor, ParseError> {
    let access = MethodAccess::from_bits_retain(reader.read_u16()?);
    let name = pool.resolve_direct(reader.read_u16()?)?;
    let signature = parse_method_descriptor(pool.utf8(reader.read_u16()?)?)?;

    let mut exceptions = Vec::new();
    let attribute_count = reader.read_u16()?;
    for _ in 0..attribute_count {
        let attribute_name = pool.utf8(reader.read_u16()?)?;
        let length = reader.read_u32()?;
        if attribute_name != EXCEPTIONS_ATTRIBUTE {
            reader.skip(length as usize)?;
            continue;
        }

        let count = reader.read_u16()?;
        let actual = 2 + 2 * count as u32;
        if actual != length {
            return Err(ParseError::AttributeLength {
                name: attribute_name.to_string(),
                declared: length,
                actual,
            });
        }
        for _ in 0..count {
            exceptions.push(pool.class_name(reader.read_u16()?)?);
        }
    }

    Ok(MethodDescriptor {
        method_type: MethodType::from_name(&name),
        name,
        access,
        parameters: signature.parameters,
        return_type: signature.return_type,
        exceptions,
    })
}

fn skip_attributes(reader: &mut ClassReader<'_>) -> Result<(), ParseError> {
    let count = reader.read_u16()?;
    for _ in 0..count {
        let _name_index = reader.read_u16()?;
        let length = reader.read_u32()?;
        reader.skip(length as usize)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_builder::*;
    use crate::descriptor::Primitive;

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn exceptions_attribute_with_wrong_length_is_rejected() {
        let bytes = ClassFileBuilder::new("shop/Cart")
            .method_throws(ACC_PUBLIC, "save", "()V", &["java/io/IOException"])
            .exceptions_length(6)
            .build();

        match decode(&bytes) {
            Err(ParseError::AttributeLength {
                name,
                declared,
                actual,
            }) => {
                assert_eq!(name, "Exceptions");
                assert_eq!(declared, 6);
                assert_eq!(actual, 4);
            }
            other => panic!("expected AttributeLength, got {other:?}"),
        }
    }

    #[test]
    fn decodes_name_hierarchy_and_members() {
        let bytes = ClassFileBuilder::new("org/example/shop/Cart")
            .super_class(Some("org/example/shop/AbstractCart"))
            .interface("java/io/Serializable")
            .interface("org/example/shop/Priced")
            .field(ACC_PRIVATE, "items", "[Lorg/example/shop/Item;")
            .field(ACC_PRIVATE | ACC_STATIC, "count", "J")
            .method(ACC_PUBLIC, "<init>", "()V")
            .method(ACC_STATIC, "<clinit>", "()V")
            .method_throws(
                ACC_PUBLIC,
                "total",
                "(Ljava/util/Currency;I)Ljava/math/BigDecimal;",
                &["java/io/IOException"],
            )
            .build();

        let class = decode(&bytes).unwrap();
        assert_eq!(class.name(), "org.example.shop.Cart");
        assert_eq!(class.simple_name(), "Cart");
        assert_eq!(class.package_name(), "org.example.shop");
        assert_eq!(class.super_name(), Some("org.example.shop.AbstractCart"));
        assert_eq!(
            class.interfaces(),
            ["java.io.Serializable", "org.example.shop.Priced"]
        );
        assert_eq!(class.class_type(), ClassType::Class);
        assert!(!class.is_inner());

        assert_eq!(class.fields().len(), 2);
        assert_eq!(class.fields()[0].name, "items");
        assert_eq!(class.fields()[0].field_type.to_string(), "org.example.shop.Item[]");
        assert_eq!(
            class.fields()[1].field_type,
            TypeDescriptor::primitive(Primitive::Long)
        );
        assert!(class.fields()[1].access.contains(FieldAccess::STATIC));

        let kinds: Vec<MethodType> = class.methods().iter().map(|m| m.method_type).collect();
        assert_eq!(
            kinds,
            vec![MethodType::Constructor, MethodType::Initializer, MethodType::Method]
        );
        let total = &class.methods()[2];
        assert_eq!(total.parameters.len(), 2);
        assert_eq!(total.return_type, TypeDescriptor::object("java.math.BigDecimal"));
        assert_eq!(total.exceptions, vec!["java.io.IOException"]);

        assert_eq!(
            names(class.imported_class_names()),
            vec![
                "java.io.IOException",
                "java.io.Serializable",
                "java.math.BigDecimal",
                "java.util.Currency",
                "org.example.shop.AbstractCart",
                "org.example.shop.Item",
                "org.example.shop.Priced",
            ]
        );
    }

    #[test]
    fn pool_only_references_become_imports_but_arrays_and_self_do_not() {
        let bytes = ClassFileBuilder::new("a/Main")
            .long_constant(1 << 40)
            .class_ref("a/Helper")
            .class_ref("[Lb/Element;")
            .method_ref("c/Service", "run", "()V")
            .double_constant(2.5)
            .int_constant(7)
            .string_constant("hello")
            .build();

        let class = decode(&bytes).unwrap();
        assert_eq!(
            names(class.imported_class_names()),
            vec!["a.Helper", "c.Service", "java.lang.Object"]
        );
    }

    #[test]
    fn class_type_precedence_follows_access_bits() {
        let cases = [
            (ACC_PUBLIC | ACC_SUPER, ClassType::Class),
            (ACC_PUBLIC | ACC_ABSTRACT, ClassType::AbstractClass),
            (ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT, ClassType::Interface),
            (
                ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT | ACC_ANNOTATION,
                ClassType::Annotation,
            ),
            (ACC_PUBLIC | ACC_FINAL | ACC_ENUM, ClassType::Enumeration),
        ];
        for (access, expected) in cases {
            let bytes = ClassFileBuilder::new("p/T").access(access).build();
            assert_eq!(decode(&bytes).unwrap().class_type(), expected);
        }
    }

    #[test]
    fn inner_and_anonymous_flags_come_from_the_name() {
        let named = ClassDescriptor::new(ClassParts::new("p.Outer$Inner"));
        assert!(named.is_inner());
        assert!(!named.is_anonymous());

        let anonymous = ClassDescriptor::new(ClassParts::new("p.Outer$12"));
        assert!(anonymous.is_inner());
        assert!(anonymous.is_anonymous());

        let top = ClassDescriptor::new(ClassParts::new("Standalone"));
        assert_eq!(top.package_name(), "");
        assert!(!top.is_inner());
    }

    #[test]
    fn root_type_may_omit_super_but_others_may_not() {
        let root = ClassFileBuilder::new("java/lang/Object").super_class(None).build();
        let object = decode(&root).unwrap();
        assert_eq!(object.super_name(), None);
        assert!(object.imported_class_names().is_empty());

        let orphan = ClassFileBuilder::new("p/Orphan").super_class(None).build();
        assert!(matches!(
            decode(&orphan),
            Err(ParseError::MissingSuperClass(name)) if name == "p.Orphan"
        ));
    }

    #[test]
    fn bad_magic_truncation_and_trailing_bytes_fail() {
        let mut bytes = ClassFileBuilder::new("p/A").build();

        let mut wrong = bytes.clone();
        wrong[0] = 0xCB;
        assert!(matches!(decode(&wrong), Err(ParseError::BadMagic(0xCBFEBABE))));

        for cut in [3, 9, bytes.len() / 2, bytes.len() - 1] {
            assert!(
                matches!(decode(&bytes[..cut]), Err(ParseError::Truncated { .. })),
                "cut at {cut}"
            );
        }

        bytes.push(0);
        assert!(matches!(decode(&bytes), Err(ParseError::TrailingBytes(1))));
    }

    #[test]
    fn malformed_member_descriptor_fails_the_whole_class() {
        let bytes = ClassFileBuilder::new("p/A")
            .field(ACC_PUBLIC, "broken", "Ljava/lang/String")
            .build();
        assert!(matches!(decode(&bytes), Err(ParseError::Descriptor { .. })));
    }

    #[test]
    fn decode_from_reader_matches_slice_decoding() {
        let bytes = ClassFileBuilder::new("p/A").interface("p/I").build();
        let from_reader = decode_from(std::io::Cursor::new(bytes.clone())).unwrap();
        assert_eq!(from_reader, decode(&bytes).unwrap());
    }

    #[test]
    fn imports_are_a_function_of_the_parts() {
        let mut parts = ClassParts::new("p.A");
        parts.interfaces.push("p.I".to_string());
        parts.methods.push(MethodDescriptor {
            name: "get".to_string(),
            access: MethodAccess::PUBLIC,
            parameters: vec![TypeDescriptor::primitive(Primitive::Int)],
            return_type: TypeDescriptor::object("q.Value"),
            exceptions: vec!["p.A".to_string()],
            method_type: MethodType::Method,
        });
        let class = ClassDescriptor::new(parts.clone());
        assert_eq!(class, ClassDescriptor::new(parts));
        assert_eq!(
            names(class.imported_class_names()),
            vec!["java.lang.Object", "p.I", "q.Value"]
        );
    }
}

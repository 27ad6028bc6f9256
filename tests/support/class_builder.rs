//! Assembles class file bytes for tests.
#![allow(dead_code)]

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_ANNOTATION: u16 = 0x2000;
pub const ACC_ENUM: u16 = 0x4000;

enum Constant {
    Utf8(String),
    Integer(i32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    NameAndType(u16, u16),
    MethodRef(u16, u16),
}

struct Pool {
    entries: Vec<(u16, Constant)>,
    next_slot: u16,
}

impl Pool {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_slot: 1,
        }
    }

    fn push(&mut self, constant: Constant) -> u16 {
        let slot = self.next_slot;
        let width = if matches!(constant, Constant::Long(_) | Constant::Double(_)) {
            2
        } else {
            1
        };
        self.entries.push((slot, constant));
        self.next_slot += width;
        slot
    }

    fn utf8(&mut self, value: &str) -> u16 {
        for (slot, constant) in &self.entries {
            if let Constant::Utf8(existing) = constant
                && existing == value
            {
                return *slot;
            }
        }
        self.push(Constant::Utf8(value.to_string()))
    }

    fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        for (slot, constant) in &self.entries {
            if let Constant::Class(existing) = constant
                && *existing == name_index
            {
                return *slot;
            }
        }
        self.push(Constant::Class(name_index))
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.next_slot.to_be_bytes());
        for (_, constant) in &self.entries {
            match constant {
                Constant::Utf8(value) => {
                    out.push(1);
                    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
                    out.extend_from_slice(value.as_bytes());
                }
                Constant::Integer(value) => {
                    out.push(3);
                    out.extend_from_slice(&value.to_be_bytes());
                }
                Constant::Long(value) => {
                    out.push(5);
                    out.extend_from_slice(&value.to_be_bytes());
                }
                Constant::Double(value) => {
                    out.push(6);
                    out.extend_from_slice(&value.to_bits().to_be_bytes());
                }
                Constant::Class(name) => {
                    out.push(7);
                    out.extend_from_slice(&name.to_be_bytes());
                }
                Constant::String(value) => {
                    out.push(8);
                    out.extend_from_slice(&value.to_be_bytes());
                }
                Constant::MethodRef(class, nat) => {
                    out.push(10);
                    out.extend_from_slice(&class.to_be_bytes());
                    out.extend_from_slice(&nat.to_be_bytes());
                }
                Constant::NameAndType(name, descriptor) => {
                    out.push(12);
                    out.extend_from_slice(&name.to_be_bytes());
                    out.extend_from_slice(&descriptor.to_be_bytes());
                }
            }
        }
    }
}

enum PoolItem {
    Long(i64),
    Double(f64),
    Integer(i32),
    Str(String),
    ClassRef(String),
    MethodRef(String, String, String),
}

struct Member {
    access: u16,
    name: String,
    descriptor: String,
    exceptions: Vec<String>,
}

/// Class names are given in internal form (`java/lang/String`).
pub struct ClassFileBuilder {
    name: String,
    access: u16,
    super_class: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<Member>,
    methods: Vec<Member>,
    pool_items: Vec<PoolItem>,
    exceptions_length: Option<u32>,
}

impl ClassFileBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            access: ACC_PUBLIC | ACC_SUPER,
            super_class: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            pool_items: Vec::new(),
            exceptions_length: None,
        }
    }

    pub fn access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    pub fn super_class(mut self, name: Option<&str>) -> Self {
        self.super_class = name.map(str::to_string);
        self
    }

    pub fn interface(mut self, name: &str) -> Self {
        self.interfaces.push(name.to_string());
        self
    }

    pub fn field(mut self, access: u16, name: &str, descriptor: &str) -> Self {
        self.fields.push(Member {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            exceptions: Vec::new(),
        });
        self
    }

    pub fn method(self, access: u16, name: &str, descriptor: &str) -> Self {
        self.method_throws(access, name, descriptor, &[])
    }

    pub fn method_throws(
        mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        exceptions: &[&str],
    ) -> Self {
        self.methods.push(Member {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            exceptions: exceptions.iter().map(|e| e.to_string()).collect(),
        });
        self
    }

    /// Writes `length` as the declared size of every `Exceptions` attribute,
    /// whatever the body holds.
    pub fn exceptions_length(mut self, length: u32) -> Self {
        self.exceptions_length = Some(length);
        self
    }

    /// Adds a class reference that only lives in the constant pool, the way
    /// a class touched from a method body would.
    pub fn class_ref(mut self, name: &str) -> Self {
        self.pool_items.push(PoolItem::ClassRef(name.to_string()));
        self
    }

    pub fn method_ref(mut self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.pool_items.push(PoolItem::MethodRef(
            owner.to_string(),
            name.to_string(),
            descriptor.to_string(),
        ));
        self
    }

    pub fn long_constant(mut self, value: i64) -> Self {
        self.pool_items.push(PoolItem::Long(value));
        self
    }

    pub fn double_constant(mut self, value: f64) -> Self {
        self.pool_items.push(PoolItem::Double(value));
        self
    }

    pub fn int_constant(mut self, value: i32) -> Self {
        self.pool_items.push(PoolItem::Integer(value));
        self
    }

    pub fn string_constant(mut self, value: &str) -> Self {
        self.pool_items.push(PoolItem::Str(value.to_string()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = Pool::new();
        for item in &self.pool_items {
            match item {
                PoolItem::Long(v) => {
                    pool.push(Constant::Long(*v));
                }
                PoolItem::Double(v) => {
                    pool.push(Constant::Double(*v));
                }
                PoolItem::Integer(v) => {
                    pool.push(Constant::Integer(*v));
                }
                PoolItem::Str(v) => {
                    let utf8 = pool.utf8(v);
                    pool.push(Constant::String(utf8));
                }
                PoolItem::ClassRef(name) => {
                    pool.class(name);
                }
                PoolItem::MethodRef(owner, name, descriptor) => {
                    let class = pool.class(owner);
                    let name = pool.utf8(name);
                    let descriptor = pool.utf8(descriptor);
                    let nat = pool.push(Constant::NameAndType(name, descriptor));
                    pool.push(Constant::MethodRef(class, nat));
                }
            }
        }

        let this_index = pool.class(&self.name);
        let super_index = self.super_class.as_deref().map(|s| pool.class(s)).unwrap_or(0);
        let interface_indices: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();

        let signature_attr = pool.utf8("Signature");
        let code_attr = pool.utf8("Code");
        let exceptions_attr = pool.utf8("Exceptions");
        let source_file_attr = pool.utf8("SourceFile");
        let source_file = pool.utf8("Fixture.java");

        let fields: Vec<(u16, u16, u16)> = self
            .fields
            .iter()
            .map(|f| (f.access, pool.utf8(&f.name), pool.utf8(&f.descriptor)))
            .collect();
        let methods: Vec<(u16, u16, u16, Vec<u16>)> = self
            .methods
            .iter()
            .map(|m| {
                let exceptions = m.exceptions.iter().map(|e| pool.class(e)).collect();
                (m.access, pool.utf8(&m.name), pool.utf8(&m.descriptor), exceptions)
            })
            .collect();

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&52u16.to_be_bytes());
        pool.write(&mut out);

        out.extend_from_slice(&self.access.to_be_bytes());
        out.extend_from_slice(&this_index.to_be_bytes());
        out.extend_from_slice(&super_index.to_be_bytes());
        out.extend_from_slice(&(interface_indices.len() as u16).to_be_bytes());
        for index in interface_indices {
            out.extend_from_slice(&index.to_be_bytes());
        }

        out.extend_from_slice(&(fields.len() as u16).to_be_bytes());
        for (access, name, descriptor) in fields {
            out.extend_from_slice(&access.to_be_bytes());
            out.extend_from_slice(&name.to_be_bytes());
            out.extend_from_slice(&descriptor.to_be_bytes());
            // One opaque attribute so the decoder has to skip it.
            out.extend_from_slice(&1u16.to_be_bytes());
            write_attribute(&mut out, signature_attr, &descriptor.to_be_bytes());
        }

        out.extend_from_slice(&(methods.len() as u16).to_be_bytes());
        for (access, name, descriptor, exceptions) in methods {
            out.extend_from_slice(&access.to_be_bytes());
            out.extend_from_slice(&name.to_be_bytes());
            out.extend_from_slice(&descriptor.to_be_bytes());
            let attribute_count: u16 = if exceptions.is_empty() { 1 } else { 2 };
            out.extend_from_slice(&attribute_count.to_be_bytes());
            // max_stack, max_locals, code_length = 1, `return`, no handlers, no attributes
            let code = [0, 1, 0, 1, 0, 0, 0, 1, 0xB1, 0, 0, 0, 0];
            write_attribute(&mut out, code_attr, &code);
            if !exceptions.is_empty() {
                let mut body = Vec::new();
                body.extend_from_slice(&(exceptions.len() as u16).to_be_bytes());
                for index in exceptions {
                    body.extend_from_slice(&index.to_be_bytes());
                }
                match self.exceptions_length {
                    Some(length) => {
                        out.extend_from_slice(&exceptions_attr.to_be_bytes());
                        out.extend_from_slice(&length.to_be_bytes());
                        out.extend_from_slice(&body);
                    }
                    None => write_attribute(&mut out, exceptions_attr, &body),
                }
            }
        }

        out.extend_from_slice(&1u16.to_be_bytes());
        write_attribute(&mut out, source_file_attr, &source_file.to_be_bytes());
        out
    }
}

fn write_attribute(out: &mut Vec<u8>, name_index: u16, body: &[u8]) {
    out.extend_from_slice(&name_index.to_be_bytes());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
}

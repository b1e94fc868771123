use std::collections::HashMap;

#[derive(Clone, PartialEq, Eq, Hash)]
enum Key {
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(String),
    String(String),
    NameAndType(String, String),
    MethodRef(String, String, String),
    FieldRef(String, String, String),
}

/// Deduplicating constant-pool writer.
#[derive(Default)]
pub struct ConstantPoolBuilder {
    bytes: Vec<u8>,
    /// Next free slot; slot 0 is never used.
    next: u16,
    interned: HashMap<Key, u16>,
}

impl ConstantPoolBuilder {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            next: 1,
            interned: HashMap::new(),
        }
    }

    /// `constant_pool_count` as written in the class file.
    pub fn count(&self) -> u16 {
        self.next
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn intern(&mut self, key: Key, encode: impl FnOnce(&mut Self) -> Vec<u8>, slots: u16) -> u16 {
        if let Some(index) = self.interned.get(&key) {
            return *index;
        }
        let entry = encode(self);
        let index = self.next;
        self.bytes.extend_from_slice(&entry);
        self.next += slots;
        self.interned.insert(key, index);
        index
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        self.intern(
            Key::Utf8(value.to_string()),
            |_| {
                let encoded = encode_modified_utf8(value);
                let mut entry = vec![1];
                entry.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
                entry.extend_from_slice(&encoded);
                entry
            },
            1,
        )
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        self.intern(
            Key::Integer(value),
            |_| with_tag(3, &value.to_be_bytes()),
            1,
        )
    }

    pub fn float(&mut self, value: f32) -> u16 {
        self.intern(
            Key::Float(value.to_bits()),
            |_| with_tag(4, &value.to_bits().to_be_bytes()),
            1,
        )
    }

    pub fn long(&mut self, value: i64) -> u16 {
        self.intern(Key::Long(value), |_| with_tag(5, &value.to_be_bytes()), 2)
    }

    pub fn double(&mut self, value: f64) -> u16 {
        self.intern(
            Key::Double(value.to_bits()),
            |_| with_tag(6, &value.to_bits().to_be_bytes()),
            2,
        )
    }

    pub fn class(&mut self, internal_name: &str) -> u16 {
        self.intern(
            Key::Class(internal_name.to_string()),
            |cp| with_tag(7, &cp.utf8(internal_name).to_be_bytes()),
            1,
        )
    }

    pub fn string(&mut self, value: &str) -> u16 {
        self.intern(
            Key::String(value.to_string()),
            |cp| with_tag(8, &cp.utf8(value).to_be_bytes()),
            1,
        )
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        self.intern(
            Key::NameAndType(name.to_string(), descriptor.to_string()),
            |cp| {
                let name = cp.utf8(name);
                let descriptor = cp.utf8(descriptor);
                with_two(12, name, descriptor)
            },
            1,
        )
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.intern(
            Key::MethodRef(class.to_string(), name.to_string(), descriptor.to_string()),
            |cp| {
                let class = cp.class(class);
                let nat = cp.name_and_type(name, descriptor);
                with_two(10, class, nat)
            },
            1,
        )
    }

    pub fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.intern(
            Key::FieldRef(class.to_string(), name.to_string(), descriptor.to_string()),
            |cp| {
                let class = cp.class(class);
                let nat = cp.name_and_type(name, descriptor);
                with_two(9, class, nat)
            },
            1,
        )
    }
}

fn with_tag(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut entry = Vec::with_capacity(payload.len() + 1);
    entry.push(tag);
    entry.extend_from_slice(payload);
    entry
}

fn with_two(tag: u8, first: u16, second: u16) -> Vec<u8> {
    let mut entry = vec![tag];
    entry.extend_from_slice(&first.to_be_bytes());
    entry.extend_from_slice(&second.to_be_bytes());
    entry
}

/// Encodes a string the way class files store it: NUL as `C0 80` and
/// supplementary characters as two three-byte surrogates.
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

/*!
 Data structures produced and consumed by the `typedstream` decoder.
*/

/// A class descriptor stored in the `typedstream`: a name and an archiver-assigned version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    /// The name of the class, e.g. `NSString`
    pub name: String,
    /// The encoded version of the class
    pub version: u64,
}

impl Class {
    pub(crate) fn new(name: String, version: u64) -> Self {
        Self { name, version }
    }
}

/// A single decoded primitive value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text data
    String(String),
    /// Signed integer types are coerced into this container
    SignedInteger(i64),
    /// Unsigned integer types are coerced into this container
    UnsignedInteger(u64),
    /// A 32-bit float
    Float(f32),
    /// A 64-bit double
    Double(f64),
    /// A raw byte whose type encoding was not recognized
    Byte(u8),
    /// An arbitrary run of bytes read via the `[N]` array type form
    ByteArray(Vec<u8>),
    /// A class appearing inline in a value list, ahead of its instance data
    ClassRef(Class),
}

/// Records produced by the decoder, one per top-level item or embedded data list
#[derive(Debug, Clone, PartialEq)]
pub enum Archivable {
    /// An instance of a class with its ordered, anonymous instance data. `typedstream` does not
    /// store field names, so data is positional.
    Object(Class, Vec<Value>),
    /// A free-standing value list that is likely a property of the enclosing object but is not
    /// itself attached to a class.
    Data(Vec<Value>),
    /// A class appearing in the stream, usually part of an inheritance chain, with no data of
    /// its own yet.
    Class(Class),
    /// A reserved, temporarily-empty slot in the objects table, overwritten once an object's
    /// data is fully read. `typedstream` writes an object's class ahead of its instance data, so
    /// the decoder reserves the eventual slot before it knows what will fill it.
    Placeholder,
    /// An embedded type list, captured verbatim so a later back-reference can resolve it. Never
    /// surfaced to callers of [`decode`](crate::decode) — it is consumed internally.
    Type(Vec<Type>),
}

impl Archivable {
    /// If `self` is an [`Object`](Archivable::Object) of class `NSString` or `NSMutableString`
    /// whose first value is text, return that text — unless it looks like attribute-key
    /// metadata rather than user-visible content.
    ///
    /// The filter rejects text that starts with `__k`, or that contains `Attribute` or `NS`, or
    /// that has no letters or digits at all. This is a deliberate heuristic carried from the
    /// original decoder to suppress keys like `__kIMMessagePartAttributeName`; it will also
    /// reject legitimate user text that happens to contain the substring `NS`.
    ///
    /// # Example
    ///
    /// ```
    /// use typedstream::{Archivable, Class, Value};
    ///
    /// let nsstring = Archivable::Object(
    ///     Class { name: "NSString".to_string(), version: 1 },
    ///     vec![Value::String("Hello world".to_string())],
    /// );
    /// assert_eq!(nsstring.string_value(), Some("Hello world"));
    ///
    /// let attribute_key = Archivable::Object(
    ///     Class { name: "NSString".to_string(), version: 1 },
    ///     vec![Value::String("__kIMMessagePartAttributeName".to_string())],
    /// );
    /// assert_eq!(attribute_key.string_value(), None);
    /// ```
    pub fn string_value(&self) -> Option<&str> {
        let Archivable::Object(class, values) = self else {
            return None;
        };
        if class.name != "NSString" && class.name != "NSMutableString" {
            return None;
        }
        let Some(Value::String(text)) = values.first() else {
            return None;
        };
        if text.starts_with("__k") || text.contains("Attribute") || text.contains("NS") {
            return None;
        }
        if !text.chars().any(|c| c.is_alphanumeric()) {
            return None;
        }
        Some(text)
    }

    /// If `self` is an [`Object`](Archivable::Object) of class `NSNumber` whose first value is a
    /// signed integer, return it.
    pub fn integer_value(&self) -> Option<i64> {
        let Archivable::Object(class, values) = self else {
            return None;
        };
        if class.name != "NSNumber" {
            return None;
        }
        match values.first() {
            Some(Value::SignedInteger(n)) => Some(*n),
            _ => None,
        }
    }

    /// If `self` is an [`Object`](Archivable::Object) of class `NSNumber` whose first value is a
    /// double, return it.
    pub fn double_value(&self) -> Option<f64> {
        let Archivable::Object(class, values) = self else {
            return None;
        };
        if class.name != "NSNumber" {
            return None;
        }
        match values.first() {
            Some(Value::Double(n)) => Some(*n),
            _ => None,
        }
    }
}

/// A single type-encoding symbol, one per field described by a type list
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Length-prefixed UTF-8 text. Denoted by `+` (`0x2B`).
    Utf8String,
    /// A nested type list plus its data, embedded as a C-string. Denoted by `*` (`0x2A`).
    EmbeddedData,
    /// An instance of a class, usually followed by its data. Denoted by `@` (`0x40`).
    Object,
    /// An `i8`, `i16`, or `i32`, width determined by its prefix tag. Denoted by one of
    /// `c`/`i`/`l`/`q`/`s`.
    SignedInt,
    /// A `u8`, `u16`, or `u32`, width determined by its prefix tag. Denoted by one of
    /// `C`/`I`/`L`/`Q`/`S`.
    UnsignedInt,
    /// An `f32`. Denoted by `f` (`0x66`).
    Float,
    /// An `f64`. Denoted by `d` (`0x64`).
    Double,
    /// A literal string captured for reuse later, e.g. an interned class name.
    String(String),
    /// A fixed-length run of raw bytes, from the `[N]` array type form.
    Array(usize),
    /// A type byte the decoder does not assign specific meaning to.
    Unknown(u8),
}

impl Type {
    pub(crate) fn from_byte(byte: &u8) -> Self {
        match byte {
            0x40 => Self::Object,
            0x2B => Self::Utf8String,
            0x2A => Self::EmbeddedData,
            0x66 => Self::Float,
            0x64 => Self::Double,
            0x63 | 0x69 | 0x6c | 0x71 | 0x73 => Self::SignedInt,
            0x43 | 0x49 | 0x4c | 0x51 | 0x53 => Self::UnsignedInt,
            other => Self::Unknown(*other),
        }
    }

    pub(crate) fn new_string(string: String) -> Self {
        Self::String(string)
    }

    /// Parse the `[N]` array type form, e.g. `[904c]` -> `Array(904)`. `types` is the raw type
    /// bytes with the leading `[` still present.
    pub(crate) fn get_array_length(types: &[u8]) -> Option<Vec<Type>> {
        if types.first() != Some(&0x5b) {
            return None;
        }
        let mut saw_digit = false;
        let mut len: u64 = 0;
        for byte in types[1..].iter().take_while(|b| b.is_ascii_digit()) {
            saw_digit = true;
            len = len * 10 + u64::from(byte - b'0');
        }
        if !saw_digit || len == 0 {
            return None;
        }
        Some(vec![Type::Array(len as usize)])
    }
}

/// The result of reading a class from the stream: either an already-interned class resolved by
/// index, or a freshly-read root-to-leaf inheritance chain to be appended to the objects table.
#[derive(Debug)]
pub(crate) enum ClassResult {
    /// A back-reference to an already-seen class
    Index(usize),
    /// A newly-read class hierarchy, root class first
    ClassHierarchy(Vec<Archivable>),
}

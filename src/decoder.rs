/*!
 Contains the single-pass reader that decodes `typedstream` data into [`Archivable`] records.

 Logic derived from the original NeXT/Apple `typedstream` format as described in
 `typedstream.h` and `archive.c` from the old `libobjc` sources; no Apple code or headers
 are used here, only the wire format those sources document.
*/
use std::collections::HashSet;

use crate::{
    error::TypedStreamError,
    models::{Archivable, Class, ClassResult, Type, Value},
};

/// Indicates an [`i16`] follows in the byte stream
const I_16: u8 = 0x81;
/// Indicates an [`i32`] follows in the byte stream
const I_32: u8 = 0x82;
/// Indicates a raw [`f32`] or [`f64`] follows; the surrounding [`Type`] determines the width
const DECIMAL: u8 = 0x83;
/// Indicates the start of a new object, class chain, or embedded type
const START: u8 = 0x84;
/// Indicates there is nothing more to read, e.g. the end of a class inheritance chain
const EMPTY: u8 = 0x85;
/// Indicates the end of the current record
const END: u8 = 0x86;
/// Bytes at or above this value are a back-reference index into a table, not literal data
const REFERENCE_TAG: u8 = 0x92;

/// Required typedstream encoding version
const SUPPORTED_VERSION: u64 = 4;
/// Required encoding signature
const SUPPORTED_SIGNATURE: &str = "streamtyped";
/// Required system version; this is the value macOS/iOS Foundation has used since the format
/// was last revised, so it is the only one this decoder accepts
const SUPPORTED_SYSTEM_VERSION: i64 = 1000;

/// A single-pass, single-threaded reader over a `typedstream` byte buffer
struct TypedStreamReader<'a> {
    /// The buffer being decoded
    stream: &'a [u8],
    /// The current cursor position
    idx: usize,
    /// Types seen so far, in order of first appearance; later back-references index into this
    types_table: Vec<Vec<Type>>,
    /// Objects, classes, and embedded types seen so far, in order of first appearance
    object_table: Vec<Archivable>,
    /// Index of the types-table row for each row that has already been interned into
    /// `object_table` while in an embedded-data context, so it is never interned twice
    embedded_seen: HashSet<usize>,
    /// The objects-table index of the placeholder currently awaiting its instance data, if any
    placeholder: Option<usize>,
}

impl<'a> TypedStreamReader<'a> {
    fn new(stream: &'a [u8]) -> Self {
        Self {
            stream,
            idx: 0,
            types_table: vec![],
            object_table: vec![],
            embedded_seen: HashSet::new(),
            placeholder: None,
        }
    }

    // --- Byte reader ---------------------------------------------------

    /// Read the byte at an arbitrary index, bounds-checked
    fn at(&self, index: usize) -> Result<u8, TypedStreamError> {
        self.stream
            .get(index)
            .copied()
            .ok_or(TypedStreamError::OutOfBounds(index, self.stream.len()))
    }

    /// Peek at the byte under the cursor without advancing
    fn current(&self) -> Result<u8, TypedStreamError> {
        self.at(self.idx)
    }

    /// Peek at the byte one past the cursor without advancing
    fn next(&self) -> Result<u8, TypedStreamError> {
        self.at(self.idx + 1)
    }

    /// Read exactly `n` bytes and advance the cursor past them
    fn read_exact(&mut self, n: usize) -> Result<&'a [u8], TypedStreamError> {
        let end = self.idx + n;
        let slice = self
            .stream
            .get(self.idx..end)
            .ok_or(TypedStreamError::OutOfBounds(end, self.stream.len()))?;
        self.idx = end;
        Ok(slice)
    }

    /// Read exactly `n` bytes as UTF-8 text and advance the cursor past them
    fn read_utf8(&mut self, n: usize) -> Result<String, TypedStreamError> {
        let slice = self.read_exact(n)?;
        std::str::from_utf8(slice)
            .map(str::to_owned)
            .map_err(TypedStreamError::StringParseError)
    }

    // --- Integer / float reader -----------------------------------------

    /// Read a signed integer, widened to 64 bits
    fn read_signed_int(&mut self) -> Result<i64, TypedStreamError> {
        match self.current()? {
            I_16 => {
                self.idx += 1;
                let bytes: [u8; 2] = self
                    .read_exact(2)?
                    .try_into()
                    .map_err(TypedStreamError::SliceError)?;
                Ok(i64::from(i16::from_le_bytes(bytes)))
            }
            I_32 => {
                self.idx += 1;
                let bytes: [u8; 4] = self
                    .read_exact(4)?
                    .try_into()
                    .map_err(TypedStreamError::SliceError)?;
                Ok(i64::from(i32::from_le_bytes(bytes)))
            }
            byte => {
                // A repeated type tag can precede an integer in dictionary-like contexts; skip
                // it and recurse, unless the byte immediately after is the end of the record.
                if byte > REFERENCE_TAG && self.next()? != END {
                    self.idx += 1;
                    return self.read_signed_int();
                }
                self.idx += 1;
                Ok(i64::from(byte as i8))
            }
        }
    }

    /// Read an unsigned integer, widened to 64 bits
    fn read_unsigned_int(&mut self) -> Result<u64, TypedStreamError> {
        match self.current()? {
            I_16 => {
                self.idx += 1;
                let bytes: [u8; 2] = self
                    .read_exact(2)?
                    .try_into()
                    .map_err(TypedStreamError::SliceError)?;
                Ok(u64::from(u16::from_le_bytes(bytes)))
            }
            I_32 => {
                self.idx += 1;
                let bytes: [u8; 4] = self
                    .read_exact(4)?
                    .try_into()
                    .map_err(TypedStreamError::SliceError)?;
                Ok(u64::from(u32::from_le_bytes(bytes)))
            }
            byte => {
                self.idx += 1;
                Ok(u64::from(byte))
            }
        }
    }

    /// Read a single-precision float
    fn read_float(&mut self) -> Result<f32, TypedStreamError> {
        match self.current()? {
            DECIMAL => {
                self.idx += 1;
                let bytes: [u8; 4] = self
                    .read_exact(4)?
                    .try_into()
                    .map_err(TypedStreamError::SliceError)?;
                Ok(f32::from_le_bytes(bytes))
            }
            _ => Ok(self.read_signed_int()? as f32),
        }
    }

    /// Read a double-precision float
    fn read_double(&mut self) -> Result<f64, TypedStreamError> {
        match self.current()? {
            DECIMAL => {
                self.idx += 1;
                let bytes: [u8; 8] = self
                    .read_exact(8)?
                    .try_into()
                    .map_err(TypedStreamError::SliceError)?;
                Ok(f64::from_le_bytes(bytes))
            }
            _ => Ok(self.read_signed_int()? as f64),
        }
    }

    /// Read `n` raw bytes as an opaque array
    fn read_array(&mut self, n: usize) -> Result<Vec<u8>, TypedStreamError> {
        Ok(self.read_exact(n)?.to_vec())
    }

    /// Read a length-prefixed UTF-8 string
    fn read_string(&mut self) -> Result<String, TypedStreamError> {
        let length = self.read_unsigned_int()?;
        self.read_utf8(length as usize)
    }

    /// Read a back-reference pointer byte, resolving it to a table index
    fn read_pointer(&mut self) -> Result<usize, TypedStreamError> {
        let pointer = self.current()?;
        self.idx += 1;
        let index = i64::from(pointer) - i64::from(REFERENCE_TAG);
        usize::try_from(index).map_err(|_| TypedStreamError::InvalidPointer(pointer))
    }

    // --- Type reader -----------------------------------------------------

    /// Read a type-encoding string: a length, then that many raw type bytes, expanded into a
    /// list of [`Type`]s. Handles the `[N]` array form specially.
    fn read_type(&mut self) -> Result<Vec<Type>, TypedStreamError> {
        let length = self.read_unsigned_int()?;
        let raw = self.read_exact(length as usize)?.to_vec();

        if raw.first() == Some(&b'[') {
            return Type::get_array_length(&raw).ok_or(TypedStreamError::InvalidArray);
        }

        Ok(raw.iter().map(Type::from_byte).collect())
    }

    /// Get the current type list, either by reading it fresh from the stream or resolving a
    /// back-reference into `types_table`. When `embedded` is set, the first time a given
    /// types-table row is reached through this path, it is also interned into `object_table` as
    /// an [`Archivable::Type`] (embedded data is stored as a type list in the objects table).
    fn get_type(&mut self, embedded: bool) -> Result<Option<Vec<Type>>, TypedStreamError> {
        match self.current()? {
            START => {
                self.idx += 1;
                let types = self.read_type()?;
                self.types_table.push(types.clone());
                let index = self.types_table.len() - 1;
                if embedded && self.embedded_seen.insert(index) {
                    self.object_table.push(Archivable::Type(types.clone()));
                }
                Ok(Some(types))
            }
            END => Ok(None),
            _ => {
                // Collapse a run of repeated bytes, e.g. a doubled type tag in a dictionary.
                while self.current()? == self.next()? {
                    self.idx += 1;
                }
                let pointer = self.current()?;
                let index = self.read_pointer()?;
                let types = self
                    .types_table
                    .get(index)
                    .cloned()
                    .ok_or(TypedStreamError::InvalidPointer(pointer))?;
                if embedded && self.embedded_seen.insert(index) {
                    self.object_table.push(Archivable::Type(types.clone()));
                }
                Ok(Some(types))
            }
        }
    }

    // --- Class reader ------------------------------------------------------

    /// Read a class, either a fresh inheritance chain (root class first) or a back-reference to
    /// one already interned in `object_table`.
    fn read_class(&mut self) -> Result<ClassResult, TypedStreamError> {
        let mut chain: Vec<Archivable> = vec![];
        match self.current()? {
            START => {
                while self.current()? == START {
                    self.idx += 1;
                }
                let length = self.read_unsigned_int()?;
                if length >= u64::from(REFERENCE_TAG) {
                    return Ok(ClassResult::Index((length - u64::from(REFERENCE_TAG)) as usize));
                }

                let class_name = self.read_utf8(length as usize)?;
                let version = self.read_unsigned_int()?;

                self.types_table.push(vec![Type::new_string(class_name.clone())]);
                chain.push(Archivable::Class(Class::new(class_name, version)));

                if let ClassResult::ClassHierarchy(parent) = self.read_class()? {
                    chain.extend(parent);
                }
            }
            EMPTY => {
                self.idx += 1;
            }
            _ => {
                return Ok(ClassResult::Index(self.read_pointer()?));
            }
        }
        Ok(ClassResult::ClassHierarchy(chain))
    }

    /// Read an object: a fresh class chain (interned and returned as "no value yet"), a
    /// back-reference to an already-interned class or object, or nothing.
    fn read_object(&mut self) -> Result<Option<Archivable>, TypedStreamError> {
        match self.current()? {
            START => match self.read_class()? {
                ClassResult::Index(index) => Ok(self.object_table.get(index).cloned()),
                ClassResult::ClassHierarchy(classes) => {
                    self.object_table.extend(classes);
                    Ok(None)
                }
            },
            EMPTY => {
                self.idx += 1;
                Ok(None)
            }
            _ => {
                let index = self.read_pointer()?;
                Ok(self.object_table.get(index).cloned())
            }
        }
    }

    // --- Object / value assembler ------------------------------------------

    /// `embedded_data` fields are a `START` byte followed by a type list and its values, stored
    /// as a C string embedded in an object's instance data.
    fn read_embedded_data(&mut self) -> Result<Option<Archivable>, TypedStreamError> {
        if self.current()? != START {
            return Err(TypedStreamError::InvalidHeader);
        }
        self.idx += 1;
        match self.get_type(true)? {
            Some(types) => self.read_types(types),
            None => Ok(None),
        }
    }

    /// Read one record's worth of values given its type list, assembling objects, free data, or
    /// an embedded record as appropriate.
    fn read_types(&mut self, found_types: Vec<Type>) -> Result<Option<Archivable>, TypedStreamError> {
        let mut values: Vec<Value> = vec![];
        let mut is_object = false;

        for found_type in found_types {
            match found_type {
                Type::Utf8String => values.push(Value::String(self.read_string()?)),
                Type::EmbeddedData => return self.read_embedded_data(),
                Type::Object => {
                    is_object = true;
                    let index = self.object_table.len();
                    self.placeholder = Some(index);
                    self.object_table.push(Archivable::Placeholder);

                    if let Some(object) = self.read_object()? {
                        match object {
                            Archivable::Object(class, data) if !data.is_empty() => {
                                // This exact object instance was already fully read; drop our
                                // reservation and hand back the shared instance.
                                self.object_table.truncate(index);
                                self.placeholder = None;
                                return Ok(Some(Archivable::Object(class, data)));
                            }
                            Archivable::Object(class, _) => values.push(Value::ClassRef(class)),
                            Archivable::Class(class) => values.push(Value::ClassRef(class)),
                            Archivable::Data(data) => values.extend(data),
                            Archivable::Placeholder | Archivable::Type(_) => {}
                        }
                    }
                }
                Type::SignedInt => values.push(Value::SignedInteger(self.read_signed_int()?)),
                Type::UnsignedInt => values.push(Value::UnsignedInteger(self.read_unsigned_int()?)),
                Type::Float => values.push(Value::Float(self.read_float()?)),
                Type::Double => values.push(Value::Double(self.read_double()?)),
                Type::Unknown(byte) => values.push(Value::Byte(byte)),
                Type::String(s) => values.push(Value::String(s)),
                Type::Array(n) => values.push(Value::ByteArray(self.read_array(n)?)),
            }
        }

        if let Some(index) = self.placeholder {
            if !values.is_empty() {
                if let Some(Value::ClassRef(class)) = values.last() {
                    // The class arrived but its data is still to come in a later record; keep
                    // the placeholder open.
                    self.object_table[index] = Archivable::Object(class.clone(), vec![]);
                } else if let Some(Archivable::Class(class)) = self.object_table.get(index + 1) {
                    self.object_table[index] = Archivable::Object(class.clone(), values.clone());
                    self.placeholder = None;
                    return Ok(self.object_table.get(index).cloned());
                } else if let Some(Archivable::Object(_, data)) = self.object_table.get_mut(index) {
                    data.extend(values.clone());
                    self.placeholder = None;
                    return Ok(self.object_table.get(index).cloned());
                } else {
                    self.object_table[index] = Archivable::Data(values.clone());
                    self.placeholder = None;
                    return Ok(self.object_table.get(index).cloned());
                }
            }
        }

        if !values.is_empty() && !is_object {
            return Ok(Some(Archivable::Data(values)));
        }
        Ok(None)
    }

    // --- Public surface ------------------------------------------------------

    /// Validate the fixed header: encoding version, signature, and system version
    fn validate_header(&mut self) -> Result<(), TypedStreamError> {
        let version = self.read_unsigned_int()?;
        let signature = self.read_string()?;
        let system_version = self.read_signed_int()?;

        if version != SUPPORTED_VERSION
            || signature != SUPPORTED_SIGNATURE
            || system_version != SUPPORTED_SYSTEM_VERSION
        {
            return Err(TypedStreamError::InvalidHeader);
        }

        Ok(())
    }

    /// Decode the whole stream into an ordered sequence of [`Archivable`]s
    fn parse(&mut self) -> Result<Vec<Archivable>, TypedStreamError> {
        let mut out = vec![];

        self.validate_header()?;

        while self.idx < self.stream.len() {
            if self.current()? == END {
                self.idx += 1;
                continue;
            }

            if let Some(found_types) = self.get_type(false)? {
                if let Some(archivable) = self.read_types(found_types)? {
                    out.push(archivable);
                }
            }
        }

        Ok(out)
    }
}

/// Decode a `typedstream` byte buffer into an ordered sequence of [`Archivable`] records.
///
/// `bytes` must begin with the version-4 `streamtyped` header (system version 1000); any other
/// prefix, or any truncation partway through a record, is reported as an error rather than a
/// partial result.
pub fn decode(bytes: &[u8]) -> Result<Vec<Archivable>, TypedStreamError> {
    TypedStreamReader::new(bytes).parse()
}

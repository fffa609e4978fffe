//! NumPy `.npy` array codec
//!
//! Signal recordings are stored one array per file in NumPy's NPY format.
//!
//! # File Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ magic: b"\x93NUMPY" (6 bytes)                │
//! │ version: major u8, minor u8                  │
//! │ header_len: u16 LE (v1) / u32 LE (v2, v3)    │
//! │ header: Python dict literal, space padded,   │
//! │   e.g. {'descr': '<i4', 'fortran_order':     │
//! │         False, 'shape': (100,), }\n          │
//! ├──────────────────────────────────────────────┤
//! │ data: product(shape) × itemsize bytes        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Only plain numeric dtypes are supported (signed/unsigned integers of 1-8
//! bytes, 32/64-bit floats). Object, string and structured arrays are
//! rejected.

use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// Magic bytes identifying an NPY file.
const MAGIC: [u8; 6] = *b"\x93NUMPY";

/// Header block (preamble + dict + newline) is padded to this alignment.
const HEADER_ALIGN_BYTES: usize = 64;

/// Byte order of the stored elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }
}

/// Element type of an array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl Dtype {
    /// Bytes per element.
    pub const fn item_size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// Parse a NumPy type string such as `<i4` or `|u1`.
    fn parse_descr(descr: &str) -> std::result::Result<(Self, ByteOrder), String> {
        let mut chars = descr.chars();
        let order = match chars.next() {
            Some('<') | Some('|') => ByteOrder::Little,
            Some('>') => ByteOrder::Big,
            Some('=') => ByteOrder::native(),
            _ => return Err(format!("unsupported dtype descr '{descr}'")),
        };

        let dtype = match chars.as_str() {
            "i1" => Self::I8,
            "i2" => Self::I16,
            "i4" => Self::I32,
            "i8" => Self::I64,
            "u1" => Self::U8,
            "u2" => Self::U16,
            "u4" => Self::U32,
            "u8" => Self::U64,
            "f4" => Self::F32,
            "f8" => Self::F64,
            _ => return Err(format!("unsupported dtype descr '{descr}'")),
        };

        Ok((dtype, order))
    }

    /// Type string written by [`encode`] (always little-endian).
    fn descr(self) -> &'static str {
        match self {
            Self::I8 => "|i1",
            Self::I16 => "<i2",
            Self::I32 => "<i4",
            Self::I64 => "<i8",
            Self::U8 => "|u1",
            Self::U16 => "<u2",
            Self::U32 => "<u4",
            Self::U64 => "<u8",
            Self::F32 => "<f4",
            Self::F64 => "<f8",
        }
    }
}

/// Decoded elements in the file's native element type
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Apply `$body` to the vector inside any [`SampleData`] variant.
macro_rules! with_elements {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            SampleData::I8($v) => $body,
            SampleData::I16($v) => $body,
            SampleData::I32($v) => $body,
            SampleData::I64($v) => $body,
            SampleData::U8($v) => $body,
            SampleData::U16($v) => $body,
            SampleData::U32($v) => $body,
            SampleData::U64($v) => $body,
            SampleData::F32($v) => $body,
            SampleData::F64($v) => $body,
        }
    };
}

impl SampleData {
    pub fn dtype(&self) -> Dtype {
        match self {
            Self::I8(_) => Dtype::I8,
            Self::I16(_) => Dtype::I16,
            Self::I32(_) => Dtype::I32,
            Self::I64(_) => Dtype::I64,
            Self::U8(_) => Dtype::U8,
            Self::U16(_) => Dtype::U16,
            Self::U32(_) => Dtype::U32,
            Self::U64(_) => Dtype::U64,
            Self::F32(_) => Dtype::F32,
            Self::F64(_) => Dtype::F64,
        }
    }

    pub fn len(&self) -> usize {
        with_elements!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widen every element to f64.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_elements!(self, v => v.iter().map(|&x| x as f64).collect())
    }

    /// Cast every element to i32 (floats saturate, NaN becomes 0).
    pub fn to_i32_vec(&self) -> Vec<i32> {
        with_elements!(self, v => v.iter().map(|&x| x as i32).collect())
    }

    /// Elements cast to i32 in native byte order, the wire format of the
    /// sample endpoint.
    pub fn to_i32_ne_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * 4);
        for x in self.to_i32_vec() {
            out.extend_from_slice(&x.to_ne_bytes());
        }
        out
    }

    fn write_le(&self, buf: &mut Vec<u8>) {
        with_elements!(self, v => {
            for x in v {
                buf.extend_from_slice(&x.to_le_bytes());
            }
        })
    }
}

/// One decoded NPY array (C order, flattened)
#[derive(Debug, Clone, PartialEq)]
pub struct SampleArray {
    pub shape: Vec<usize>,
    pub data: SampleData,
}

impl SampleArray {
    /// One-dimensional array over `data`.
    pub fn from_vec(data: SampleData) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn dtype(&self) -> Dtype {
        self.data.dtype()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

trait Element: Sized {
    const SIZE: usize;
    fn from_bytes(bytes: &[u8], order: ByteOrder) -> Self;
}

macro_rules! impl_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                fn from_bytes(bytes: &[u8], order: ByteOrder) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    match order {
                        ByteOrder::Little => <$t>::from_le_bytes(raw),
                        ByteOrder::Big => <$t>::from_be_bytes(raw),
                    }
                }
            }
        )*
    };
}

impl_element!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

fn decode_elements<T: Element>(raw: &[u8], order: ByteOrder) -> Vec<T> {
    raw.chunks_exact(T::SIZE)
        .map(|chunk| T::from_bytes(chunk, order))
        .collect()
}

/// Parsed header dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    dtype: Dtype,
    order: ByteOrder,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// Locate `'key':` in the header dict and return the text after the colon.
fn dict_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let quoted_single = format!("'{key}'");
    let quoted_double = format!("\"{key}\"");
    let start = header
        .find(&quoted_single)
        .map(|i| i + quoted_single.len())
        .or_else(|| header.find(&quoted_double).map(|i| i + quoted_double.len()))?;

    let rest = header[start..].trim_start();
    rest.strip_prefix(':').map(str::trim_start)
}

fn parse_header(header: &str) -> std::result::Result<Header, String> {
    let descr_value = dict_value(header, "descr").ok_or("header has no 'descr'")?;
    let quote = descr_value
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or("'descr' is not a plain type string")?;
    let descr_body = &descr_value[1..];
    let descr_end = descr_body
        .find(quote)
        .ok_or("unterminated 'descr' string")?;
    let (dtype, order) = Dtype::parse_descr(&descr_body[..descr_end])?;

    let fortran_value = dict_value(header, "fortran_order").ok_or("header has no 'fortran_order'")?;
    let fortran_order = if fortran_value.starts_with("True") {
        true
    } else if fortran_value.starts_with("False") {
        false
    } else {
        return Err("invalid 'fortran_order' value".to_string());
    };

    let shape_value = dict_value(header, "shape").ok_or("header has no 'shape'")?;
    let shape_body = shape_value
        .strip_prefix('(')
        .and_then(|s| s.find(')').map(|end| &s[..end]))
        .ok_or("'shape' is not a tuple")?;
    let shape = shape_body
        .split(',')
        .map(str::trim)
        .filter(|dim| !dim.is_empty())
        .map(|dim| {
            dim.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|e| format!("invalid shape dimension '{dim}': {e}"))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Header {
        dtype,
        order,
        fortran_order,
        shape,
    })
}

/// Decode an in-memory NPY document. `path` is only used for error reporting.
pub fn decode(bytes: &[u8], path: &Path) -> Result<SampleArray> {
    let mk_err = |reason: String| Error::SampleDecode {
        path: path.to_path_buf(),
        reason,
    };

    if bytes.len() < MAGIC.len() + 2 || bytes[..MAGIC.len()] != MAGIC {
        return Err(mk_err("not an NPY file (bad magic)".into()));
    }

    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => {
            let raw = bytes.get(8..10).ok_or_else(|| mk_err("truncated header length".into()))?;
            (u16::from_le_bytes([raw[0], raw[1]]) as usize, 10)
        }
        2 | 3 => {
            let raw = bytes.get(8..12).ok_or_else(|| mk_err("truncated header length".into()))?;
            (u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize, 12)
        }
        other => return Err(mk_err(format!("unsupported NPY version {other}.{}", bytes[7]))),
    };

    let header_end = header_start + header_len;
    let header_bytes = bytes
        .get(header_start..header_end)
        .ok_or_else(|| mk_err("truncated header".into()))?;
    let header_text =
        std::str::from_utf8(header_bytes).map_err(|e| mk_err(format!("header is not text: {e}")))?;
    let header = parse_header(header_text).map_err(mk_err)?;

    if header.fortran_order && header.shape.len() > 1 {
        return Err(mk_err("Fortran-ordered arrays are not supported".into()));
    }

    let count = header
        .shape
        .iter()
        .try_fold(1usize, |acc, dim| acc.checked_mul(*dim))
        .ok_or_else(|| mk_err("shape overflows".into()))?;
    let expected = count
        .checked_mul(header.dtype.item_size())
        .ok_or_else(|| mk_err("shape overflows".into()))?;

    let raw = &bytes[header_end..];
    if raw.len() != expected {
        return Err(mk_err(format!(
            "expected {expected} data bytes for shape {:?}, found {}",
            header.shape,
            raw.len()
        )));
    }

    let order = header.order;
    let data = match header.dtype {
        Dtype::I8 => SampleData::I8(decode_elements(raw, order)),
        Dtype::I16 => SampleData::I16(decode_elements(raw, order)),
        Dtype::I32 => SampleData::I32(decode_elements(raw, order)),
        Dtype::I64 => SampleData::I64(decode_elements(raw, order)),
        Dtype::U8 => SampleData::U8(decode_elements(raw, order)),
        Dtype::U16 => SampleData::U16(decode_elements(raw, order)),
        Dtype::U32 => SampleData::U32(decode_elements(raw, order)),
        Dtype::U64 => SampleData::U64(decode_elements(raw, order)),
        Dtype::F32 => SampleData::F32(decode_elements(raw, order)),
        Dtype::F64 => SampleData::F64(decode_elements(raw, order)),
    };

    Ok(SampleArray {
        shape: header.shape,
        data,
    })
}

/// Read and decode an NPY file.
///
/// A missing file surfaces as [`Error::Io`] with `NotFound` kind.
pub fn read(path: &Path) -> Result<SampleArray> {
    let bytes = fs::read(path)?;
    decode(&bytes, path)
}

/// Encode an array as an NPY document (little-endian, C order).
pub fn encode(array: &SampleArray) -> Vec<u8> {
    let shape = match array.shape.as_slice() {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => {
            let parts: Vec<String> = dims.iter().map(ToString::to_string).collect();
            format!("({})", parts.join(", "))
        }
    };
    let dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        array.dtype().descr(),
        shape
    );

    // v1 has a u16 header length; fall back to v2 for huge headers
    let preamble_len = if dict.len() + HEADER_ALIGN_BYTES < u16::MAX as usize {
        10
    } else {
        12
    };
    let unpadded = preamble_len + dict.len() + 1;
    let padding = (HEADER_ALIGN_BYTES - unpadded % HEADER_ALIGN_BYTES) % HEADER_ALIGN_BYTES;
    let header_len = dict.len() + padding + 1;

    let mut buf = Vec::with_capacity(unpadded + padding + array.len() * array.dtype().item_size());
    buf.extend_from_slice(&MAGIC);
    if preamble_len == 10 {
        buf.extend_from_slice(&[1, 0]);
        buf.extend_from_slice(&(header_len as u16).to_le_bytes());
    } else {
        buf.extend_from_slice(&[2, 0]);
        buf.extend_from_slice(&(header_len as u32).to_le_bytes());
    }
    buf.extend_from_slice(dict.as_bytes());
    buf.extend(std::iter::repeat(b' ').take(padding));
    buf.push(b'\n');

    array.data.write_le(&mut buf);
    buf
}

/// Encode and write an array to `path`.
pub fn write(path: &Path, array: &SampleArray) -> Result<()> {
    fs::write(path, encode(array))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn path() -> PathBuf {
        PathBuf::from("x.npy")
    }

    /// Hand-built v1 document the way numpy lays it out.
    fn raw_npy(descr: &str, shape: &str, data: &[u8]) -> Vec<u8> {
        let dict = format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': {shape}, }}");
        let mut header = dict.into_bytes();
        while (10 + header.len() + 1) % 64 != 0 {
            header.push(b' ');
        }
        header.push(b'\n');

        let mut buf = MAGIC.to_vec();
        buf.extend_from_slice(&[1, 0]);
        buf.extend_from_slice(&(header.len() as u16).to_le_bytes());
        buf.extend_from_slice(&header);
        buf.extend_from_slice(data);
        buf
    }

    #[test]
    fn decodes_little_endian_i32() {
        let mut data = Vec::new();
        for x in [1i32, -2, 300] {
            data.extend_from_slice(&x.to_le_bytes());
        }
        let array = decode(&raw_npy("<i4", "(3,)", &data), &path()).unwrap();

        assert_eq!(array.shape, vec![3]);
        assert_eq!(array.data, SampleData::I32(vec![1, -2, 300]));
    }

    #[test]
    fn decodes_big_endian_i16() {
        let mut data = Vec::new();
        for x in [256i16, -1] {
            data.extend_from_slice(&x.to_be_bytes());
        }
        let array = decode(&raw_npy(">i2", "(2,)", &data), &path()).unwrap();
        assert_eq!(array.data, SampleData::I16(vec![256, -1]));
    }

    #[test]
    fn decodes_float64_and_widens() {
        let mut data = Vec::new();
        for x in [0.5f64, -1.25] {
            data.extend_from_slice(&x.to_le_bytes());
        }
        let array = decode(&raw_npy("<f8", "(2,)", &data), &path()).unwrap();
        assert_eq!(array.data.to_f64_vec(), vec![0.5, -1.25]);
    }

    #[test]
    fn decodes_two_dimensional_shape() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let array = decode(&raw_npy("|u1", "(2, 3)", &data), &path()).unwrap();
        assert_eq!(array.shape, vec![2, 3]);
        assert_eq!(array.len(), 6);
    }

    #[test]
    fn decodes_empty_array() {
        let array = decode(&raw_npy("<i4", "(0,)", &[]), &path()).unwrap();
        assert!(array.is_empty());
    }

    #[test]
    fn rejects_bad_magic() {
        let err = decode(b"NOTNUMPYATALL", &path()).unwrap_err();
        assert!(matches!(err, Error::SampleDecode { .. }));
    }

    #[test]
    fn rejects_truncated_data() {
        let err = decode(&raw_npy("<i4", "(3,)", &[0u8; 8]), &path()).unwrap_err();
        assert!(matches!(err, Error::SampleDecode { .. }));
    }

    #[test]
    fn rejects_unsupported_dtype() {
        let err = decode(&raw_npy("<U8", "(1,)", &[0u8; 32]), &path()).unwrap_err();
        assert!(matches!(err, Error::SampleDecode { .. }));
    }

    #[test]
    fn rejects_fortran_matrix() {
        let dict = "{'descr': '<i4', 'fortran_order': True, 'shape': (2, 2), }";
        let mut buf = MAGIC.to_vec();
        buf.extend_from_slice(&[1, 0]);
        buf.extend_from_slice(&((dict.len() + 1) as u16).to_le_bytes());
        buf.extend_from_slice(dict.as_bytes());
        buf.push(b'\n');
        buf.extend_from_slice(&[0u8; 16]);

        let err = decode(&buf, &path()).unwrap_err();
        assert!(matches!(err, Error::SampleDecode { .. }));
    }

    #[test]
    fn encoded_header_is_aligned() {
        let array = SampleArray::from_vec(SampleData::I16(vec![1, 2, 3]));
        let bytes = encode(&array);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;

        assert_eq!((10 + header_len) % HEADER_ALIGN_BYTES, 0);
        assert_eq!(bytes[10 + header_len - 1], b'\n');
        assert_eq!(decode(&bytes, &path()).unwrap(), array);
    }

    #[test]
    fn i32_wire_bytes_saturate_floats() {
        let data = SampleData::F64(vec![1.9, -3.5, 1e12, f64::NAN]);
        let bytes = data.to_i32_ne_bytes();
        let values: Vec<i32> = bytes
            .chunks_exact(4)
            .map(|c| i32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(values, vec![1, -3, i32::MAX, 0]);
    }
}

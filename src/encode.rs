//! Encoding a [`Value`] tree to MessagePack bytes.
use byteorder::{BigEndian, WriteBytesExt};

use crate::depth_tracking::DepthTracker;
use crate::error::{EncodeError, EncodeResult};
use crate::marker::Marker;
use crate::value::{Ext, Value};

/// Encode `value` into a freshly allocated buffer.
pub fn encode(value: &Value) -> EncodeResult<Vec<u8>> {
    let mut buf = Vec::new();
    encode_into(value, &mut buf)?;
    Ok(buf)
}

/// Encode `value`, appending onto the caller-supplied `sink`.
///
/// On error, `sink` may have gained a partial, indeterminate prefix; truncate
/// it back to its pre-call length if that matters to the caller:
///
/// ```
/// use valuepack::{encode_into, Value};
///
/// let mut sink = Vec::new();
/// let mark = sink.len();
/// if encode_into(&Value::Float(f64::NAN), &mut sink).is_err() {
///     sink.truncate(mark);
/// }
/// ```
pub fn encode_into(value: &Value, sink: &mut Vec<u8>) -> EncodeResult<()> {
    write_value(value, sink, DepthTracker::new())
}

fn write_value(value: &Value, buf: &mut Vec<u8>, depth: DepthTracker) -> EncodeResult<()> {
    match value {
        Value::Nil => {
            buf.push(Marker::Nil.to_u8());
            Ok(())
        }
        Value::Bool(false) => {
            buf.push(Marker::False.to_u8());
            Ok(())
        }
        Value::Bool(true) => {
            buf.push(Marker::True.to_u8());
            Ok(())
        }
        Value::Integer(n) => {
            write_integer(*n, buf);
            Ok(())
        }
        Value::Float(n) => write_float(*n, buf),
        Value::Str(s) => write_str(s, buf),
        Value::Bin(b) => write_bin(b, buf),
        Value::Array(items) => write_array(items, buf, depth),
        Value::Map(pairs) => write_map(pairs, buf, depth),
        Value::Ext(ext) => write_ext(ext, buf),
    }
}

fn write_integer(n: crate::integer::Integer, buf: &mut Vec<u8>) {
    if let Some(u) = n.as_u64() {
        write_pos_int(u, buf);
    } else {
        // Unwrap is sound: `as_u64` returning `None` means the integer is negative,
        // and every negative `Integer` fits in an `i64` by construction.
        write_neg_int(n.as_i64().unwrap(), buf);
    }
}

fn write_pos_int(n: u64, buf: &mut Vec<u8>) {
    if n <= i8::MAX as u64 {
        buf.push(n as u8);
    } else if n <= u8::MAX as u64 {
        buf.push(Marker::UInt8.to_u8());
        buf.push(n as u8);
    } else if n <= u16::MAX as u64 {
        buf.push(Marker::UInt16.to_u8());
        buf.write_u16::<BigEndian>(n as u16).unwrap();
    } else if n <= u32::MAX as u64 {
        buf.push(Marker::UInt32.to_u8());
        buf.write_u32::<BigEndian>(n as u32).unwrap();
    } else {
        buf.push(Marker::UInt64.to_u8());
        buf.write_u64::<BigEndian>(n).unwrap();
    }
}

fn write_neg_int(n: i64, buf: &mut Vec<u8>) {
    if n >= -32 {
        buf.push(n as i8 as u8);
    } else if n >= i8::MIN as i64 {
        buf.push(Marker::Int8.to_u8());
        buf.push(n as i8 as u8);
    } else if n >= i16::MIN as i64 {
        buf.push(Marker::Int16.to_u8());
        buf.write_i16::<BigEndian>(n as i16).unwrap();
    } else if n >= i32::MIN as i64 {
        buf.push(Marker::Int32.to_u8());
        buf.write_i32::<BigEndian>(n as i32).unwrap();
    } else {
        buf.push(Marker::Int64.to_u8());
        buf.write_i64::<BigEndian>(n).unwrap();
    }
}

fn write_float(n: f64, buf: &mut Vec<u8>) -> EncodeResult<()> {
    if !n.is_finite() {
        return Err(EncodeError::NonFiniteFloat);
    }
    buf.push(Marker::F64.to_u8());
    buf.write_f64::<BigEndian>(n).unwrap();
    Ok(())
}

fn write_str(s: &str, buf: &mut Vec<u8>) -> EncodeResult<()> {
    let bytes = s.as_bytes();
    let len = bytes.len();
    if len > u32::MAX as usize {
        return Err(EncodeError::LengthTooLong { actual: len });
    }
    if len <= 31 {
        buf.push(Marker::FIXSTR_MIN | len as u8);
    } else if len <= u8::MAX as usize {
        buf.push(Marker::Str8.to_u8());
        buf.push(len as u8);
    } else if len <= u16::MAX as usize {
        buf.push(Marker::Str16.to_u8());
        buf.write_u16::<BigEndian>(len as u16).unwrap();
    } else {
        buf.push(Marker::Str32.to_u8());
        buf.write_u32::<BigEndian>(len as u32).unwrap();
    }
    buf.extend_from_slice(bytes);
    Ok(())
}

fn write_bin(bytes: &[u8], buf: &mut Vec<u8>) -> EncodeResult<()> {
    let len = bytes.len();
    if len > u32::MAX as usize {
        return Err(EncodeError::LengthTooLong { actual: len });
    }
    if len <= u8::MAX as usize {
        buf.push(Marker::Bin8.to_u8());
        buf.push(len as u8);
    } else if len <= u16::MAX as usize {
        buf.push(Marker::Bin16.to_u8());
        buf.write_u16::<BigEndian>(len as u16).unwrap();
    } else {
        buf.push(Marker::Bin32.to_u8());
        buf.write_u32::<BigEndian>(len as u32).unwrap();
    }
    buf.extend_from_slice(bytes);
    Ok(())
}

fn write_array(items: &[Value], buf: &mut Vec<u8>, depth: DepthTracker) -> EncodeResult<()> {
    let len = items.len();
    if len <= 15 {
        buf.push(Marker::FIXARRAY_MIN | len as u8);
    } else if len <= u16::MAX as usize {
        buf.push(Marker::Array16.to_u8());
        buf.write_u16::<BigEndian>(len as u16).unwrap();
    } else {
        buf.push(Marker::Array32.to_u8());
        buf.write_u32::<BigEndian>(len as u32).unwrap();
    }
    let child_depth = depth.descend().ok_or(EncodeError::DepthLimitExceeded)?;
    for item in items {
        write_value(item, buf, child_depth)?;
    }
    Ok(())
}

fn write_map(
    pairs: &std::collections::BTreeMap<String, Value>,
    buf: &mut Vec<u8>,
    depth: DepthTracker,
) -> EncodeResult<()> {
    let len = pairs.len();
    if len <= 15 {
        buf.push(Marker::FIXMAP_MIN | len as u8);
    } else if len <= u16::MAX as usize {
        buf.push(Marker::Map16.to_u8());
        buf.write_u16::<BigEndian>(len as u16).unwrap();
    } else {
        buf.push(Marker::Map32.to_u8());
        buf.write_u32::<BigEndian>(len as u32).unwrap();
    }
    let child_depth = depth.descend().ok_or(EncodeError::DepthLimitExceeded)?;
    for (key, val) in pairs {
        write_str(key, buf)?;
        write_value(val, buf, child_depth)?;
    }
    Ok(())
}

fn write_ext(ext: &Ext, buf: &mut Vec<u8>) -> EncodeResult<()> {
    let len = ext.data.len();
    if len > u32::MAX as usize {
        return Err(EncodeError::LengthTooLong { actual: len });
    }
    match len {
        1 => buf.push(Marker::FixExt1.to_u8()),
        2 => buf.push(Marker::FixExt2.to_u8()),
        4 => buf.push(Marker::FixExt4.to_u8()),
        8 => buf.push(Marker::FixExt8.to_u8()),
        16 => buf.push(Marker::FixExt16.to_u8()),
        _ if len <= u8::MAX as usize => {
            buf.push(Marker::Ext8.to_u8());
            buf.push(len as u8);
        }
        _ if len <= u16::MAX as usize => {
            buf.push(Marker::Ext16.to_u8());
            buf.write_u16::<BigEndian>(len as u16).unwrap();
        }
        _ => {
            buf.push(Marker::Ext32.to_u8());
            buf.write_u32::<BigEndian>(len as u32).unwrap();
        }
    }
    buf.push(ext.tag as u8);
    buf.extend_from_slice(&ext.data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::collections::BTreeMap;

    #[test]
    fn encodes_nil() {
        assert_eq!(encode(&Value::Nil).unwrap(), vec![0xc0]);
    }

    #[test]
    fn encodes_bool() {
        assert_eq!(encode(&Value::Bool(true)).unwrap(), vec![0xc3]);
        assert_eq!(encode(&Value::Bool(false)).unwrap(), vec![0xc2]);
    }

    #[test]
    fn encodes_minimum_width_positive_integers() {
        assert_eq!(encode(&127u32.into()).unwrap(), vec![0x7f]);
        assert_eq!(encode(&128u32.into()).unwrap(), vec![0xcc, 0x80]);
        assert_eq!(encode(&255u32.into()).unwrap(), vec![0xcc, 0xff]);
        assert_eq!(encode(&256u32.into()).unwrap(), vec![0xcd, 0x01, 0x00]);
        assert_eq!(encode(&65535u32.into()).unwrap(), vec![0xcd, 0xff, 0xff]);
        assert_eq!(
            encode(&65536u32.into()).unwrap(),
            vec![0xce, 0x00, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn encodes_minimum_width_negative_integers() {
        assert_eq!(encode(&(-1i32).into()).unwrap(), vec![0xff]);
        assert_eq!(encode(&(-32i32).into()).unwrap(), vec![0xe0]);
        assert_eq!(encode(&(-33i32).into()).unwrap(), vec![0xd0, 0xdf]);
        assert_eq!(encode(&(-128i32).into()).unwrap(), vec![0xd0, 0x80]);
        assert_eq!(encode(&(-129i32).into()).unwrap(), vec![0xd1, 0xff, 0x7f]);
    }

    #[test]
    fn promotes_large_integers_to_native_64_bit_markers() {
        let big = Value::from(u64::MAX);
        let bytes = encode(&big).unwrap();
        assert_eq!(bytes[0], 0xcf);
        let small_neg = Value::from(i64::MIN);
        let bytes = encode(&small_neg).unwrap();
        assert_eq!(bytes[0], 0xd3);
    }

    #[test]
    fn encodes_float64() {
        let bytes = encode(&Value::Float(1.5)).unwrap();
        assert_eq!(bytes, vec![0xcb, 0x3f, 0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn float_zero_always_uses_float_marker() {
        let bytes = encode(&Value::Float(0.0)).unwrap();
        assert_eq!(bytes[0], 0xcb);
    }

    #[test]
    fn rejects_non_finite_float() {
        assert_eq!(
            encode(&Value::Float(f64::NAN)),
            Err(EncodeError::NonFiniteFloat)
        );
        assert_eq!(
            encode(&Value::Float(f64::INFINITY)),
            Err(EncodeError::NonFiniteFloat)
        );
    }

    #[test]
    fn encodes_fixstr_and_str8_boundary() {
        let s31 = "a".repeat(31);
        let bytes = encode(&Value::Str(s31.clone())).unwrap();
        assert_eq!(bytes[0], 0xa0 | 31);

        let s32 = "a".repeat(32);
        let bytes = encode(&Value::Str(s32)).unwrap();
        assert_eq!(bytes[0], 0xd9);
        assert_eq!(bytes[1], 32);
    }

    #[test]
    fn encodes_hello() {
        assert_eq!(
            encode(&Value::Str("Hello".into())).unwrap(),
            vec![0xa5, 0x48, 0x65, 0x6c, 0x6c, 0x6f]
        );
    }

    #[test]
    fn encodes_array_and_fixarray_array16_boundary() {
        let arr = Value::Array(vec![1u32.into(), 2u32.into(), 3u32.into()]);
        assert_eq!(encode(&arr).unwrap(), vec![0x93, 0x01, 0x02, 0x03]);

        let fifteen = Value::Array((0..15).map(|_| Value::Nil).collect());
        let bytes = encode(&fifteen).unwrap();
        assert_eq!(bytes[0], 0x90 | 15);

        let sixteen = Value::Array((0..16).map(|_| Value::Nil).collect());
        let bytes = encode(&sixteen).unwrap();
        assert_eq!(bytes[0], 0xdc);
    }

    #[test]
    fn encodes_map_in_lexicographic_order() {
        let mut m = BTreeMap::new();
        m.insert("id".to_string(), 1u32.into());
        let bytes = encode(&Value::Map(m)).unwrap();
        assert_eq!(bytes, vec![0x81, 0xa2, 0x69, 0x64, 0x01]);
    }

    #[test]
    fn encodes_empty_containers() {
        assert_eq!(encode(&Value::Str(String::new())).unwrap(), vec![0xa0]);
        assert_eq!(encode(&Value::Array(vec![])).unwrap(), vec![0x90]);
        assert_eq!(encode(&Value::Map(BTreeMap::new())).unwrap(), vec![0x80]);
    }

    #[test]
    fn encodes_ext_with_fixed_width_marker() {
        let ext = Ext::new(7, vec![0u8; 8]);
        let bytes = encode(&Value::Ext(ext)).unwrap();
        assert_eq!(bytes[0], 0xd7);
        assert_eq!(bytes[1], 7);
        assert_eq!(bytes.len(), 2 + 8);
    }

    #[test]
    fn encodes_ext_with_length_prefixed_marker() {
        let ext = Ext::new(1, vec![0u8; 3]);
        let bytes = encode(&Value::Ext(ext)).unwrap();
        assert_eq!(bytes[0], 0xc7);
        assert_eq!(bytes[1], 3);
        assert_eq!(bytes[2], 1);
    }

    #[test]
    fn rejects_excessive_nesting() {
        let mut value = Value::Nil;
        for _ in 0..(crate::MAX_DEPTH + 10) {
            value = Value::Array(vec![value]);
        }
        assert_eq!(encode(&value), Err(EncodeError::DepthLimitExceeded));
    }

    #[test]
    fn encode_into_appends_to_existing_sink() {
        let mut sink = vec![0xffu8];
        encode_into(&Value::Nil, &mut sink).unwrap();
        assert_eq!(sink, vec![0xff, 0xc0]);
    }
}

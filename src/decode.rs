//! Decoding MessagePack bytes into a [`Value`] tree.
use std::collections::BTreeMap;

use byteorder::{BigEndian, ByteOrder};

use crate::depth_tracking::DepthTracker;
use crate::error::{DecodeError, DecodeResult};
use crate::integer::Integer;
use crate::marker::Marker;
use crate::value::{Ext, Value};

/// A cursor over the input byte slice that tracks its own offset for error reporting.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        let available = self.bytes.len().saturating_sub(self.pos);
        if n > available {
            return Err(DecodeError::UnexpectedEnd {
                position: self.pos,
                needed: n,
                available,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u16(&mut self) -> DecodeResult<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    fn take_u32(&mut self) -> DecodeResult<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    fn take_u64(&mut self) -> DecodeResult<u64> {
        Ok(BigEndian::read_u64(self.take(8)?))
    }

    fn take_i8(&mut self) -> DecodeResult<i8> {
        Ok(self.take_u8()? as i8)
    }

    fn take_i16(&mut self) -> DecodeResult<i16> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    fn take_i32(&mut self) -> DecodeResult<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    fn take_i64(&mut self) -> DecodeResult<i64> {
        Ok(BigEndian::read_i64(self.take(8)?))
    }
}

/// Decode exactly one top-level value from the start of `bytes`.
///
/// Trailing bytes after the value are ignored; compare `bytes.len()` against
/// however many bytes you expect the value to occupy if that matters to you.
pub fn decode(bytes: &[u8]) -> DecodeResult<Value> {
    let mut reader = Reader::new(bytes);
    read_value(&mut reader, DepthTracker::new())
}

fn read_value(reader: &mut Reader, depth: DepthTracker) -> DecodeResult<Value> {
    let marker_pos = reader.pos;
    let byte = reader.take_u8()?;

    match byte {
        Marker::POS_FIXINT_MIN..=Marker::POS_FIXINT_MAX => Ok(Value::Integer(Integer::from(byte))),
        Marker::NEG_FIXINT_MIN..=Marker::NEG_FIXINT_MAX => {
            Ok(Value::Integer(Integer::from(byte as i8 as i64)))
        }
        Marker::FIXMAP_MIN..=Marker::FIXMAP_MAX => {
            read_map(reader, (byte & 0x0f) as u32, marker_pos, depth)
        }
        Marker::FIXARRAY_MIN..=Marker::FIXARRAY_MAX => {
            read_array(reader, (byte & 0x0f) as u32, marker_pos, depth)
        }
        Marker::FIXSTR_MIN..=Marker::FIXSTR_MAX => {
            read_str(reader, (byte & 0x1f) as u32, marker_pos)
        }
        _ => match Marker::from_u8(byte) {
            Some(Marker::Nil) => Ok(Value::Nil),
            Some(Marker::False) => Ok(Value::Bool(false)),
            Some(Marker::True) => Ok(Value::Bool(true)),
            Some(Marker::Bin8) => {
                let len = reader.take_u8()? as u32;
                read_bin(reader, len)
            }
            Some(Marker::Bin16) => {
                let len = reader.take_u16()? as u32;
                read_bin(reader, len)
            }
            Some(Marker::Bin32) => {
                let len = reader.take_u32()?;
                read_bin(reader, len)
            }
            Some(Marker::Ext8) => {
                let len = reader.take_u8()? as u32;
                read_ext(reader, len)
            }
            Some(Marker::Ext16) => {
                let len = reader.take_u16()? as u32;
                read_ext(reader, len)
            }
            Some(Marker::Ext32) => {
                let len = reader.take_u32()?;
                read_ext(reader, len)
            }
            Some(Marker::F32) => {
                let bits = reader.take_u32()?;
                Ok(Value::Float(f32::from_bits(bits) as f64))
            }
            Some(Marker::F64) => {
                let bits = reader.take_u64()?;
                Ok(Value::Float(f64::from_bits(bits)))
            }
            Some(Marker::UInt8) => Ok(Value::Integer(Integer::from(reader.take_u8()?))),
            Some(Marker::UInt16) => Ok(Value::Integer(Integer::from(reader.take_u16()?))),
            Some(Marker::UInt32) => Ok(Value::Integer(Integer::from(reader.take_u32()?))),
            Some(Marker::UInt64) => Ok(Value::Integer(Integer::from(reader.take_u64()?))),
            Some(Marker::Int8) => Ok(Value::Integer(Integer::from(reader.take_i8()?))),
            Some(Marker::Int16) => Ok(Value::Integer(Integer::from(reader.take_i16()?))),
            Some(Marker::Int32) => Ok(Value::Integer(Integer::from(reader.take_i32()?))),
            Some(Marker::Int64) => Ok(Value::Integer(Integer::from(reader.take_i64()?))),
            Some(Marker::FixExt1) => read_ext(reader, 1),
            Some(Marker::FixExt2) => read_ext(reader, 2),
            Some(Marker::FixExt4) => read_ext(reader, 4),
            Some(Marker::FixExt8) => read_ext(reader, 8),
            Some(Marker::FixExt16) => read_ext(reader, 16),
            Some(Marker::Str8) => {
                let len = reader.take_u8()? as u32;
                read_str(reader, len, marker_pos)
            }
            Some(Marker::Str16) => {
                let len = reader.take_u16()? as u32;
                read_str(reader, len, marker_pos)
            }
            Some(Marker::Str32) => {
                let len = reader.take_u32()?;
                read_str(reader, len, marker_pos)
            }
            Some(Marker::Array16) => {
                let len = reader.take_u16()? as u32;
                read_array(reader, len, marker_pos, depth)
            }
            Some(Marker::Array32) => {
                let len = reader.take_u32()?;
                read_array(reader, len, marker_pos, depth)
            }
            Some(Marker::Map16) => {
                let len = reader.take_u16()? as u32;
                read_map(reader, len, marker_pos, depth)
            }
            Some(Marker::Map32) => {
                let len = reader.take_u32()?;
                read_map(reader, len, marker_pos, depth)
            }
            Some(Marker::Reserved) | None => Err(DecodeError::InvalidTypeMarker {
                position: marker_pos,
                byte,
            }),
        },
    }
}

fn read_bin(reader: &mut Reader, len: u32) -> DecodeResult<Value> {
    let bytes = reader.take(len as usize)?;
    Ok(Value::Bin(bytes.to_vec()))
}

fn read_str(reader: &mut Reader, len: u32, _marker_pos: usize) -> DecodeResult<Value> {
    let start = reader.pos;
    let bytes = reader.take(len as usize)?;
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(Value::Str(s.to_owned())),
        Err(e) => Err(DecodeError::InvalidUtf8 {
            position: start + e.valid_up_to(),
        }),
    }
}

fn read_ext(reader: &mut Reader, len: u32) -> DecodeResult<Value> {
    let tag = reader.take_i8()?;
    let data = reader.take(len as usize)?.to_vec();
    Ok(Value::Ext(Ext::new(tag, data)))
}

fn read_array(
    reader: &mut Reader,
    len: u32,
    marker_pos: usize,
    depth: DepthTracker,
) -> DecodeResult<Value> {
    let child_depth = depth.descend().ok_or(DecodeError::DepthLimitExceeded {
        position: marker_pos,
    })?;
    let mut items = Vec::with_capacity(len.min(4096) as usize);
    for _ in 0..len {
        items.push(read_value(reader, child_depth)?);
    }
    Ok(Value::Array(items))
}

fn read_map(
    reader: &mut Reader,
    len: u32,
    marker_pos: usize,
    depth: DepthTracker,
) -> DecodeResult<Value> {
    let child_depth = depth.descend().ok_or(DecodeError::DepthLimitExceeded {
        position: marker_pos,
    })?;
    let mut map = BTreeMap::new();
    for _ in 0..len {
        let key_pos = reader.pos;
        let key = match read_value(reader, child_depth)? {
            Value::Str(s) => s,
            _ => return Err(DecodeError::MapKeyNotString { position: key_pos }),
        };
        let val = read_value(reader, child_depth)?;
        map.insert(key, val);
    }
    Ok(Value::Map(map))
}

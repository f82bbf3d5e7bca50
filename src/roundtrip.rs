//! Randomized round-trip tests over boundary-driven payload sizes and a small
//! generated value tree.
#![cfg(test)]

use std::collections::BTreeMap;

use rand::distributions::Alphanumeric;
use rand::prelude::*;

use crate::{decode, encode, Ext, Value};

/// Sizes straddling every length-prefix boundary this codec has: fixstr/fixarray's
/// own small range, and the u8/u16 width changes shared by str/bin/array/map/ext.
fn boundary_sizes() -> Vec<usize> {
    let mut sizes = vec![0, 1, 15, 16, 31, 32];
    for i in 0..3 {
        sizes.push(u8::MAX as usize - 1 + i);
        sizes.push(u16::MAX as usize - 1 + i);
    }
    sizes
}

#[test]
fn bin_round_trips_across_size_boundaries() {
    let mut rng = thread_rng();
    for len in boundary_sizes() {
        let mut data = vec![0u8; len];
        rng.fill_bytes(&mut data);
        let value = Value::Bin(data);
        let bytes = encode(&value).unwrap();
        assert_eq!(decode(&bytes).unwrap(), value);
    }
}

#[test]
fn str_round_trips_across_size_boundaries() {
    let mut rng = thread_rng();
    for len in boundary_sizes() {
        let s: String = Alphanumeric
            .sample_iter(&mut rng)
            .take(len)
            .map(char::from)
            .collect();
        let value = Value::Str(s);
        let bytes = encode(&value).unwrap();
        assert_eq!(decode(&bytes).unwrap(), value);
    }
}

#[test]
fn array_round_trips_across_size_boundaries() {
    let mut rng = thread_rng();
    for len in boundary_sizes() {
        let items = (0..len).map(|_| Value::Integer(rng.gen::<u16>().into())).collect();
        let value = Value::Array(items);
        let bytes = encode(&value).unwrap();
        assert_eq!(decode(&bytes).unwrap(), value);
    }
}

#[test]
fn map_round_trips_across_size_boundaries() {
    let mut rng = thread_rng();
    for len in boundary_sizes().into_iter().take(6) {
        let mut map = BTreeMap::new();
        for i in 0..len {
            let key: String = Alphanumeric
                .sample_iter(&mut rng)
                .take(8)
                .map(char::from)
                .collect();
            map.insert(format!("{}-{}", i, key), Value::Integer(rng.gen::<u32>().into()));
        }
        let value = Value::Map(map);
        let bytes = encode(&value).unwrap();
        assert_eq!(decode(&bytes).unwrap(), value);
    }
}

#[test]
fn integers_round_trip_across_the_full_64_bit_range() {
    let mut rng = thread_rng();
    for _ in 0..256 {
        let n: i64 = rng.gen();
        let value = Value::from(n);
        let bytes = encode(&value).unwrap();
        assert_eq!(decode(&bytes).unwrap().as_i64(), Some(n));
    }
    for _ in 0..256 {
        let n: u64 = rng.gen();
        let value = Value::from(n);
        let bytes = encode(&value).unwrap();
        assert_eq!(decode(&bytes).unwrap().as_u64(), Some(n));
    }
}

#[test]
fn finite_floats_round_trip() {
    let mut rng = thread_rng();
    for _ in 0..256 {
        let n: f64 = rng.gen::<f64>() * 1e10 - 5e9;
        let value = Value::Float(n);
        let bytes = encode(&value).unwrap();
        assert_eq!(decode(&bytes).unwrap().as_f64(), Some(n));
    }
}

#[test]
fn ext_round_trips_across_fixed_and_variable_widths() {
    let mut rng = thread_rng();
    for len in [0usize, 1, 2, 3, 4, 8, 16, 17, 300] {
        let mut data = vec![0u8; len];
        rng.fill_bytes(&mut data);
        let value = Value::Ext(Ext::new(rng.gen(), data));
        let bytes = encode(&value).unwrap();
        assert_eq!(decode(&bytes).unwrap(), value);
    }
}

/// Build a randomly shaped value tree, recursing no deeper than `depth`.
fn generate_value<R: Rng>(rng: &mut R, depth: u32) -> Value {
    let choice = if depth == 0 { rng.gen_range(0..6) } else { rng.gen_range(0..8) };
    match choice {
        0 => Value::Nil,
        1 => Value::Bool(rng.gen()),
        2 => Value::Integer(rng.gen::<i32>().into()),
        3 => Value::Float(rng.gen::<f32>() as f64),
        4 => {
            let s: String = Alphanumeric
                .sample_iter(&mut *rng)
                .take(rng.gen_range(0..20))
                .map(char::from)
                .collect();
            Value::Str(s)
        }
        5 => {
            let mut data = vec![0u8; rng.gen_range(0..20)];
            rng.fill_bytes(&mut data);
            Value::Bin(data)
        }
        6 => {
            let len = rng.gen_range(0..4);
            let items = (0..len).map(|_| generate_value(rng, depth - 1)).collect();
            Value::Array(items)
        }
        _ => {
            let len = rng.gen_range(0..4);
            let mut map = BTreeMap::new();
            for i in 0..len {
                map.insert(format!("k{}", i), generate_value(rng, depth - 1));
            }
            Value::Map(map)
        }
    }
}

#[test]
fn randomly_generated_trees_round_trip() {
    let mut rng = thread_rng();
    for _ in 0..200 {
        let value = generate_value(&mut rng, 4);
        let bytes = encode(&value).unwrap();
        assert_eq!(decode(&bytes).unwrap(), value);
    }
}

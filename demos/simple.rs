use std::collections::BTreeMap;
use valuepack::{decode, encode, Value};

fn main() {
    let mut post = BTreeMap::new();
    post.insert("title".to_string(), Value::Str("Hello, MessagePack".into()));
    post.insert(
        "tags".to_string(),
        Value::Array(vec![Value::Str("intro".into()), Value::Str("demo".into())]),
    );
    post.insert("views".to_string(), Value::Integer(0u32.into()));
    let post = Value::Map(post);

    let bytes = encode(&post).expect("post encodes cleanly");
    println!("encoded {} bytes: {:02x?}", bytes.len(), bytes);

    let decoded = decode(&bytes).expect("bytes we just produced decode cleanly");
    assert_eq!(decoded, post);
    println!("round-tripped: {:?}", decoded);
}

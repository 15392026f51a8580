use bytes::{BufMut, Bytes, BytesMut};

use super::value::Value;

/// Encodes a value to its canonical bencode form.
///
/// Dictionary keys come out sorted because [`Value::Dict`] is a `BTreeMap`,
/// so `decode(encode(v)) == v` for every value.
pub fn encode(value: &Value) -> Bytes {
    let mut buf = BytesMut::new();
    encode_into(value, &mut buf);
    buf.freeze()
}

fn encode_into(value: &Value, buf: &mut BytesMut) {
    match value {
        Value::Int(i) => {
            buf.put_u8(b'i');
            buf.put_slice(i.to_string().as_bytes());
            buf.put_u8(b'e');
        }
        Value::Bytes(b) => {
            buf.put_slice(b.len().to_string().as_bytes());
            buf.put_u8(b':');
            buf.put_slice(b);
        }
        Value::List(items) => {
            buf.put_u8(b'l');
            for item in items {
                encode_into(item, buf);
            }
            buf.put_u8(b'e');
        }
        Value::Dict(entries) => {
            buf.put_u8(b'd');
            for (key, item) in entries {
                buf.put_slice(key.len().to_string().as_bytes());
                buf.put_u8(b':');
                buf.put_slice(key);
                encode_into(item, buf);
            }
            buf.put_u8(b'e');
        }
    }
}

use super::*;
use bytes::Bytes;
use std::collections::BTreeMap;

#[test]
fn decode_integer() {
    assert_eq!(decode(b"i42e").unwrap().as_int(), Some(42));
    assert_eq!(decode(b"i-7e").unwrap().as_int(), Some(-7));
    assert_eq!(decode(b"i0e").unwrap().as_int(), Some(0));
}

#[test]
fn decode_integer_rejects_malformed() {
    assert!(matches!(decode(b"ie"), Err(BencodeError::InvalidInteger(_))));
    assert!(matches!(
        decode(b"i007e"),
        Err(BencodeError::InvalidInteger(_))
    ));
    assert!(matches!(
        decode(b"i-0e"),
        Err(BencodeError::InvalidInteger(_))
    ));
    assert!(matches!(decode(b"i42"), Err(BencodeError::UnexpectedEof)));
}

#[test]
fn decode_byte_string() {
    assert_eq!(decode(b"4:spam").unwrap().as_str(), Some("spam"));
    assert_eq!(decode(b"0:").unwrap().as_bytes().unwrap().len(), 0);
    assert!(matches!(decode(b"5:spam"), Err(BencodeError::UnexpectedEof)));
}

#[test]
fn decode_list() {
    let value = decode(b"li1ei2ei3ee").unwrap();
    let items = value.as_list().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[2].as_int(), Some(3));
}

#[test]
fn decode_dict() {
    let value = decode(b"d3:bar4:spam3:fooi42ee").unwrap();
    assert_eq!(value.get(b"bar").and_then(Value::as_str), Some("spam"));
    assert_eq!(value.get(b"foo").and_then(Value::as_int), Some(42));
    assert_eq!(value.get(b"missing"), None);
}

#[test]
fn decode_rejects_non_string_key() {
    assert!(matches!(
        decode(b"di1e4:spame"),
        Err(BencodeError::NonStringKey)
    ));
}

#[test]
fn decode_rejects_trailing_data() {
    assert!(matches!(
        decode(b"i42eextra"),
        Err(BencodeError::TrailingData)
    ));
}

#[test]
fn decode_rejects_runaway_nesting() {
    let mut data = vec![b'l'; 100];
    data.extend(std::iter::repeat(b'e').take(100));
    assert!(matches!(decode(&data), Err(BencodeError::NestingTooDeep)));
}

#[test]
fn encode_sorts_dict_keys() {
    let mut dict = BTreeMap::new();
    dict.insert(Bytes::from_static(b"zz"), Value::Int(1));
    dict.insert(Bytes::from_static(b"aa"), Value::Int(2));

    let encoded = encode(&Value::Dict(dict));
    assert_eq!(&encoded[..], b"d2:aai2e2:zzi1ee");
}

#[test]
fn round_trip() {
    let cases: Vec<&[u8]> = vec![
        b"i42e",
        b"4:spam",
        b"le",
        b"de",
        b"l4:spami-3ee",
        b"d3:food3:bari1eee",
        b"d5:peersld2:ip9:127.0.0.14:porti6881eeee",
    ];

    for case in cases {
        let value = decode(case).unwrap();
        assert_eq!(&encode(&value)[..], case);
    }
}

#[test]
fn binary_strings_survive() {
    let raw: Vec<u8> = (0..=255).collect();
    let mut data = format!("{}:", raw.len()).into_bytes();
    data.extend_from_slice(&raw);

    let value = decode(&data).unwrap();
    assert_eq!(value.as_bytes().unwrap().as_ref(), raw.as_slice());
    assert_eq!(&encode(&value)[..], data.as_slice());
}

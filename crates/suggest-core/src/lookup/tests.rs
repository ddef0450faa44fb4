use std::io::Cursor;

use super::*;

fn collect<I: InputIterator>(input: I) -> Vec<Entry> {
    input.map(Result::unwrap).collect()
}

#[test]
fn encode_weight_domain() {
    assert_eq!(encode_weight(0).unwrap(), 0);
    assert_eq!(encode_weight(MAX_WEIGHT).unwrap(), i32::MAX as u32);
    assert!(matches!(encode_weight(-1), Err(SuggestError::Unsupported(_))));
    assert!(matches!(encode_weight(MAX_WEIGHT + 1), Err(SuggestError::Unsupported(_))));
}

#[test]
fn input_entries_flags() {
    let plain: InputEntries = [("a", 1), ("b", 2)].into_iter().collect();
    assert!(!plain.has_payloads());
    assert!(!plain.has_contexts());
    assert_eq!(collect(plain).len(), 2);

    let with_payload = InputEntries::new([Entry::new("a", 1).with_payload("p")]);
    assert!(with_payload.has_payloads());
    assert!(reject_extensions(&with_payload).is_err());

    let with_contexts = InputEntries::new([Entry::new("a", 1).with_contexts(vec![b"ctx".to_vec()])]);
    assert!(with_contexts.has_contexts());
    assert!(matches!(
        reject_extensions(&with_contexts),
        Err(SuggestError::Unsupported(_))
    ));
}

#[test]
fn check_entry_rules() {
    check_entry(&Entry::new("ok", 3)).unwrap();
    assert!(matches!(
        check_entry(&Entry::new("", 3)),
        Err(SuggestError::InvalidArgument(_))
    ));
    assert!(matches!(
        check_entry(&Entry::new("x", 3).with_payload("p")),
        Err(SuggestError::Unsupported(_))
    ));
}

#[test]
fn reject_contexts_on_lookup() {
    reject_contexts(None).unwrap();
    let empty: &[Vec<u8>] = &[];
    assert!(reject_contexts(Some(empty)).is_err());
}

#[test]
fn file_dictionary_weights() {
    let text = "apple\t50\n\napp\nbanana\t7\n";
    let dict = FileDictionary::new(Cursor::new(text)).unwrap();
    assert!(!dict.has_payloads());
    assert_eq!(
        collect(dict),
        vec![Entry::new("apple", 50), Entry::new("app", 1), Entry::new("banana", 7)]
    );
}

#[test]
fn file_dictionary_payloads() {
    let text = "\napple\t50\tfruit\napp\t10\tshort\n";
    let dict = FileDictionary::new(Cursor::new(text)).unwrap();
    assert!(dict.has_payloads());
    assert_eq!(
        collect(dict),
        vec![
            Entry::new("apple", 50).with_payload("fruit"),
            Entry::new("app", 10).with_payload("short"),
        ]
    );
}

#[test]
fn file_dictionary_errors() {
    let mut dict = FileDictionary::new(Cursor::new("a\t1\nb\tlots\n")).unwrap();
    assert!(dict.next().unwrap().is_ok());
    let err = dict.next().unwrap().unwrap_err();
    assert!(matches!(err, SuggestError::Parse(_)));
    assert!(err.to_string().contains("line 2"));

    let mut dict = FileDictionary::new(Cursor::new("a\t1\tp\nb\t2\n")).unwrap();
    assert!(dict.next().unwrap().is_ok());
    assert!(dict.next().unwrap().is_err());

    let mut dict = FileDictionary::new(Cursor::new("a\t1\tp\tq\n")).unwrap();
    assert!(dict.next().unwrap().is_err());
}

#[test]
fn file_dictionary_empty() {
    let mut dict = FileDictionary::new(Cursor::new("")).unwrap();
    assert!(!dict.has_payloads());
    assert!(dict.next().is_none());
}

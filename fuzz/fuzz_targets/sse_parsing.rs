#![no_main]

use libfuzzer_sys::fuzz_target;
use voltstream::SseParser;

// Arbitrary bytes must never panic the parser, and byte-at-a-time delivery
// must produce exactly the same event blocks as a single feed.
fuzz_target!(|data: &[u8]| {
    let mut whole = SseParser::new();
    let expected = whole.feed(data);

    let mut incremental = SseParser::new();
    let mut actual = Vec::new();
    for byte in data {
        actual.extend(incremental.feed(std::slice::from_ref(byte)));
    }

    assert_eq!(actual, expected);
});

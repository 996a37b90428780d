#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use voltstream::SseParser;

#[derive(Debug, Arbitrary)]
struct Chunks {
    chunks: Vec<Vec<u8>>,
}

// Chunk boundaries, including empty chunks, must never change the output.
fuzz_target!(|input: Chunks| {
    let joined: Vec<u8> = input.chunks.concat();
    let expected = SseParser::new().feed(&joined);

    let mut parser = SseParser::new();
    let mut actual = Vec::new();
    for chunk in &input.chunks {
        actual.extend(parser.feed(chunk));
    }

    assert_eq!(actual, expected);
});

//! Cross-implementation test vectors.
//!
//! The same table is run by every implementation of the identity hash. A
//! mismatch here means two runtimes would disagree on the ledger join key.

#[derive(Debug, Clone, Copy)]
pub struct TestVector {
    pub document_ref: &'static str,
    pub text: &'static str,
    pub start_offset: usize,
    pub end_offset: usize,
    pub expected: &'static str,
}

pub const TEST_VECTORS: &[TestVector] = &[
    TestVector {
        document_ref: "my-first-article",
        text: "The quick brown fox",
        start_offset: 0,
        end_offset: 19,
        expected: "6591d39ca9247edc371596edee97",
    },
    TestVector {
        document_ref: "my-first-article",
        text: "The quick brown fox",
        start_offset: 4,
        end_offset: 19,
        expected: "a17f83df5aa475a28afa20b9639f",
    },
    // Longer than the prefix: only the first 50 characters count
    TestVector {
        document_ref: "my-first-article",
        text: "The quick brown fox jumps over the lazy dog and keeps running far away",
        start_offset: 120,
        end_offset: 190,
        expected: "7f08ba6d1aa79af44b7b6ea0f76e",
    },
    TestVector {
        document_ref: "my-first-article",
        text: "The quick brown fox jumps over the lazy dog and ke",
        start_offset: 120,
        end_offset: 190,
        expected: "7f08ba6d1aa79af44b7b6ea0f76e",
    },
    TestVector {
        document_ref: "",
        text: "",
        start_offset: 0,
        end_offset: 0,
        expected: "947266fe3b35c63526d8619e1783",
    },
    TestVector {
        document_ref: "café-notes",
        text: "naïve résumé — “quoted”",
        start_offset: 3,
        end_offset: 27,
        expected: "eb47d109df2561908a566632a3b1",
    },
    // The emoji straddles the 50th UTF-16 unit and is cut in half
    TestVector {
        document_ref: "emoji",
        text: "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\u{1F600}tail",
        start_offset: 0,
        end_offset: 55,
        expected: "d78c2f067171ebf85f13d9abb2fb",
    },
    TestVector {
        document_ref: "emoji",
        text: "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\u{FFFD}tail",
        start_offset: 0,
        end_offset: 55,
        expected: "d78c2f067171ebf85f13d9abb2fb",
    },
];

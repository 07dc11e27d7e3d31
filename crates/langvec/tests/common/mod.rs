//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use langvec::langvec_embeddings::{SubwordArgs, SubwordModel};
use langvec::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// On-disk copy of the color vectors, with a word2vec header.
pub const CUSTOM_TEST_LANG: &str = "tests/custom_test_lang/";

pub const FORUM_POSTS: [&str; 6] = [
    "i really like this post",
    "thanks for that comment",
    "i enjoy this friendly forum",
    "this is a bad post",
    "i dislike this article",
    "this is not well written",
];

pub const FORUM_LABELS: [i64; 6] = [1, 1, 1, 0, 0, 0];

pub fn color_table() -> Arc<VectorTable> {
    Arc::new(
        VectorTable::from_pairs(vec![
            ("red", vec![1.0, 0.0]),
            ("green", vec![0.5, 0.5]),
            ("blue", vec![0.0, 1.0]),
            ("purple", vec![0.0, 1.0]),
        ])
        .unwrap(),
    )
}

pub fn color_lang() -> VectorLanguage {
    VectorLanguage::new(color_table()).unwrap()
}

pub fn sense_lang() -> Sense2VecLanguage {
    let table = VectorTable::from_pairs(vec![
        ("red|ADJ", vec![1.0, 0.0]),
        ("red|NOUN", vec![0.8, 0.2]),
        ("green|ADJ", vec![0.5, 0.5]),
        ("blue|ADJ", vec![0.0, 1.0]),
    ])
    .unwrap();
    Sense2VecLanguage::new(Arc::new(table)).unwrap()
}

pub fn subword_model() -> Arc<SubwordModel> {
    let args = SubwordArgs::new(4, 2, 3, 16);
    let words = vec!["red".to_string(), "green".to_string(), "blue".to_string()];
    let input: Vec<f32> = (0..(3 + 16) * 4)
        .map(|i| ((i * 13) % 17) as f32 / 17.0 - 0.5)
        .collect();
    Arc::new(SubwordModel::new(args, words, input).unwrap())
}

pub fn fasttext_lang() -> FasttextLanguage {
    FasttextLanguage::new(subword_model()).unwrap()
}

/// Write a small BPE model: "▁red" and "▁blue" merge fully.
pub fn write_bpe_model(dir: &Path) {
    fs::write(
        dir.join("vocab.json"),
        r#"{"▁": 0, "r": 1, "e": 2, "d": 3, "b": 4, "l": 5, "u": 6, "▁r": 7, "ed": 8, "▁red": 9, "▁b": 10, "lu": 11, "▁blu": 12, "▁blue": 13}"#,
    )
    .unwrap();
    fs::write(
        dir.join("merges.txt"),
        "#version: 0.2\n▁ r\ne d\n▁r ed\n▁ b\nl u\n▁b lu\n▁blu e\n",
    )
    .unwrap();
    fs::write(
        dir.join("vectors.txt"),
        "▁red 1 0 0\n▁blue 0 1 0\ne 0 0 1\n",
    )
    .unwrap();
}

pub fn bpemb_lang(dir: &Path) -> BpembLanguage {
    write_bpe_model(dir);
    BpembLanguage::new(dir).unwrap()
}

/// One unfitted adapter per backend, with the model files kept under `dir`.
pub fn every_language(dir: &Path) -> Vec<Box<dyn Transformer>> {
    vec![
        Box::new(color_lang()),
        Box::new(VectorLanguage::new(CUSTOM_TEST_LANG).unwrap()),
        Box::new(sense_lang()),
        Box::new(fasttext_lang()),
        Box::new(bpemb_lang(dir)),
        Box::new(CountVectorLanguage::new(2).unwrap()),
        Box::new(CountVectorLanguage::bag_of_words()),
    ]
}

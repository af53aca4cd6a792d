#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod mock;

pub use mock::{
    FailingCacheStore, MockConfig, MockGenerator, MockReferenceStore, MockSearchSource,
    MockStyleStore, create_mock_capabilities, mock_capabilities, ranked_result,
};

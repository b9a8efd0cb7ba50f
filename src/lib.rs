#![doc = include_str!("../README.md")]

pub mod bplustree;
mod types;

pub use bplustree::{BPlusTreeMap, Iter, Keys, Values, DEFAULT_FANOUT};

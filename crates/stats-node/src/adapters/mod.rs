//! Adapters that connect the node to its storage backends.

pub mod storage;

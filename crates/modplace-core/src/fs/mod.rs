//! Filesystem primitives shared across features.

pub mod tree;
pub mod tree_hash;

pub use tree::{create_missing_dirs, entry_exists, remove_dir_if_empty, remove_path};
pub use tree_hash::hash_tree;

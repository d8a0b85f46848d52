//! Filesystem side of templates: discovering the files of a tree, the
//! `.tdmignore` rules, and reading and writing file contents.

pub mod discovery;
pub mod ignore;
pub mod operations;

pub use discovery::{Discovery, SourceFile, WalkOptions, discover};
pub use ignore::IgnoreRules;
pub use operations::{create_file, read_source, resolve_output, write_output};

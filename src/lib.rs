//! tdmcli - capture directory trees as reusable templates.
//!
//! A template is a single `.tdmcli` archive holding every file of a tree:
//! - Repeating-key XOR obfuscation of file contents (not encryption)
//! - Textual `FILE:`/`SIZE:`/`END_OF_FILE` record framing, `DIR:` records for empty directories
//! - A bounded worker pool that reads and seals files concurrently, with one collector writing the archive
//! - A template store with import, export and relocation

pub mod app;
pub mod archive;
pub mod cipher;
pub mod config;
pub mod error;
pub mod file;
pub mod processor;
pub mod store;
pub mod types;
pub mod ui;
pub mod update;
pub mod worker;

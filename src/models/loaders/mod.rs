pub mod json_loader;

pub use json_loader::{load_import_file, parse_import_document};

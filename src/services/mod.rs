pub mod dropdown_resolver;
pub mod error_extractor;
pub mod hydrator;
pub mod name_augmenter;
pub mod validation;

pub use dropdown_resolver::{CascadeFetch, DropdownResolver};
pub use error_extractor::{first_error_leaf, global_message, import_failure_message, ErrorLeaf};
pub use hydrator::{reshape, to_view_model, to_wire_format};
pub use name_augmenter::augment_names;
pub use validation::{ValidationReport, Validator};

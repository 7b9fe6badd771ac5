pub mod answer;
pub mod loaders;
pub mod question;
pub mod question_type;
pub mod taxonomy;

pub use answer::{CorrectAnswer, TruthValue};
pub use loaders::{load_import_file, parse_import_document};
pub use question::{
    Explanation, ExplanationLevel, OptionEntry, QuestionForm, QuestionRecord, WirePayload,
};
pub use question_type::{AnswerShape, QuestionType, TypeDescriptor};
pub use taxonomy::{TaxonomyKind, TaxonomyNode};

pub mod api_context;
pub mod question_client;
pub mod taxonomy_client;

pub use api_context::ApiContext;
pub use question_client::{ListQuery, QuestionClient, QuestionPage};
pub use taxonomy_client::TaxonomyClient;

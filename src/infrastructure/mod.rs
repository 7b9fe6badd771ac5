pub mod http_executor;
pub mod request_executor;

pub use http_executor::HttpExecutor;
pub use request_executor::{
    ApiRequest, ApiResponse, CredentialProvider, HttpMethod, RequestBody, RequestExecutor,
    StaticCredentials, SuccessRange,
};

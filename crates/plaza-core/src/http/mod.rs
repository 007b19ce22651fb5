//! Outbound HTTP: transport, auth pipeline and error model.

pub mod error;
pub mod pipeline;
pub mod transport;

pub use error::{ApiError, ApiErrorKind, ApiResult, FieldErrors};
pub use pipeline::{AuthPipeline, REFRESH_PATH, RequestContext};
pub use transport::{
    ApiRequest, ApiResponse, FileUpload, FormField, FormValue, HttpTransport, RequestBody,
    Transport, USER_AGENT,
};

//! Transport abstraction over the collection API

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpTransport;
pub use mock::{MockTransport, TransportCall};
pub use traits::{
    DisplayCreated, DisplayRequest, FileUpload, SubmissionContext, SubmissionReceipt, Transport,
    UploadConfig,
};

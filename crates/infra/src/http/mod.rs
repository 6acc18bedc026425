//! HTTP transport: client, request description and response decoding.

pub mod client;
pub mod request;
pub mod response;

pub use client::{HttpClient, HttpClientBuilder};
pub use request::{MultipartForm, MultipartPart, RequestBody, RequestOptions};
pub use response::{decode_response, ResponseBody};

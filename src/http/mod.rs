//! リクエスト/レスポンスの抽象化

pub mod params;
pub mod request;
pub mod response;

pub use params::{FileUpload, ParamValue, Params};
pub use request::{Environment, Request};
pub use response::{redirect, status_response, Response, ResponseWrapper, StartResponse};

#[cfg(test)]
mod tests;

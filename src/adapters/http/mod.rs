//! HTTP boundary for the job service

pub mod jobs_http;

pub use jobs_http::{router, JobsHttpServer};

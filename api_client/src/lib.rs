//! # api_client
//!
//! REST client for the print shop backend:
//! - JSON envelope decoding with a recovery path for bodies polluted by PHP warnings
//! - Cookie-based session shared by all requests
//! - CSRF token discipline for every mutating call
//! - Typed resource operations (list, detail, create, update, delete modes,
//!   status transitions, multipart uploads)
//!
//! No call retries on its own. Failures are returned to the caller, which
//! decides how to tell the user.

pub mod auth;
pub mod client;
pub mod csrf;
pub mod envelope;
pub mod error;
pub mod resources;

pub use client::{ApiClient, ApiClientBuilder, Body, MultipartBody};
pub use error::{Error, ErrorKind};
pub use resources::{paths, DeleteMode, Resource, UploadedFile};

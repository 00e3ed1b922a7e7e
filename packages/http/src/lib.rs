//! # treefs-http
//!
//! The HTTP surface of a served directory tree.
//!
//! - [`Handler`] routes GET/POST/PUT/DELETE requests to a
//!   [`treefs_store::Editor`] and answers failures from the closed
//!   [`ErrorKind`] set.
//! - [`serve`] runs a handler over HTTP/1 on a tokio listener.
//! - [`TreeClient`] is a blocking client for the same wire format.
//!
//! ## Wire format
//!
//! A GET answers with a [`WireItem`]:
//!
//! ```json
//! {"name":"docs","type":"dir","permission":493,"owner":"alice","size":4096,
//!  "children":[{"name":"a.txt","type":"file","permission":420,"size":2}]}
//! ```
//!
//! Empty fields are omitted. Files carry their content in `data` when they are
//! requested directly, or when a directory is requested with
//! `?populateData=true`.
//!
//! ## Serving a directory
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use treefs_http::{serve, Handler};
//! use treefs_store::LocalStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let handler = Arc::new(Handler::new(LocalStore::new("/srv/files")?));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:6000").await?;
//! serve(listener, handler).await?;
//! # Ok(())
//! # }
//! ```

pub mod api_error;
pub mod error;
pub mod types;

mod client;
mod handler;
mod serialize;
mod server;

pub use api_error::{ApiError, ErrorKind};
pub use client::TreeClient;
pub use error::Error;
pub use handler::Handler;
pub use server::{bind_and_serve, serve, serve_with_limit, MAX_BODY_BYTES};
pub use types::{CreateRequest, ErrorBody, FileType, WireItem, WriteRequest};

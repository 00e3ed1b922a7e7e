//! Routes one HTTP request to the backing [`Editor`].

use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Method, Request, Response, StatusCode, Uri};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::Serialize;

use treefs_store::{Editor, Error as StoreError, Item, OpenMode};

use crate::api_error::{ApiError, ErrorKind};
use crate::types::{CreateRequest, FileType, WireItem, WriteRequest};

const POPULATE_DATA: &str = "populateData";

/// Stateless request router.
///
/// Every request resolves its path independently and performs at most one
/// backend operation. Failures are answered from the closed [`ErrorKind`]
/// set; anything the router cannot classify becomes an internal error and is
/// only described in the server log.
#[derive(Clone)]
pub struct Handler {
    editor: Arc<dyn Editor>,
}

impl Handler {
    pub fn new(editor: impl Editor + 'static) -> Self {
        Self {
            editor: Arc::new(editor),
        }
    }

    pub fn from_arc(editor: Arc<dyn Editor>) -> Self {
        Self { editor }
    }

    pub fn handle(&self, request: Request<Bytes>) -> Response<Bytes> {
        let result = request_path(request.uri()).and_then(|path| {
            log::debug!("{} /{}", request.method(), path);
            self.route(&request, &path)
        });

        result.unwrap_or_else(|error| {
            log::debug!(
                "{} {} -> {} {}",
                request.method(),
                request.uri().path(),
                error.status().as_u16(),
                error.kind().id()
            );
            error.to_response()
        })
    }

    fn route(&self, request: &Request<Bytes>, path: &str) -> Result<Response<Bytes>, ApiError> {
        match *request.method() {
            Method::GET => self.get(path, populate_requested(request.uri())),
            Method::POST => self.post(path, request.body()),
            Method::PUT => self.put(path, request.body()),
            Method::DELETE => self.delete(path),
            _ => Err(ErrorKind::MethodNotAllowed.into()),
        }
    }

    fn get(&self, path: &str, populate_data: bool) -> Result<Response<Bytes>, ApiError> {
        let item = self
            .editor
            .get(path)
            .map_err(|e| lookup_error("get", path, e))?;

        let populate = item.is_file() || populate_data;
        let wire = WireItem::from_item(&item, populate).map_err(|e| {
            log::error!("failed to serialize {}: {}", path, e);
            ApiError::internal()
        })?;

        json_response(&wire)
    }

    fn post(&self, path: &str, body: &[u8]) -> Result<Response<Bytes>, ApiError> {
        let request: CreateRequest = parse_body(body)?;

        match request.kind() {
            Some(FileType::File) => {
                let item = self
                    .editor
                    .create_file(path)
                    .map_err(|e| write_error("create file", path, e))?;
                if let Err(error) = write_to_file(&item, path, &request.data) {
                    // Leave nothing behind so the request can be retried.
                    if let Err(e) = self.editor.delete(path) {
                        log::warn!("could not remove {} after a failed write: {}", path, e);
                    }
                    return Err(error);
                }
            }
            Some(FileType::Dir) => {
                self.editor
                    .create_dir(path)
                    .map_err(|e| write_error("create dir", path, e))?;
            }
            None => {
                return Err(ApiError::bad_input(
                    "invalid type, only file and dir are accepted.",
                ))
            }
        }

        Ok(empty_response())
    }

    fn put(&self, path: &str, body: &[u8]) -> Result<Response<Bytes>, ApiError> {
        let item = self
            .editor
            .get(path)
            .map_err(|e| lookup_error("get", path, e))?;
        if !item.is_file() {
            return Err(ErrorKind::FileExpected.into());
        }

        let request: WriteRequest = parse_body(body)?;
        write_to_file(&item, path, &request.data)?;
        Ok(empty_response())
    }

    fn delete(&self, path: &str) -> Result<Response<Bytes>, ApiError> {
        self.editor.delete(path).map_err(|e| match e {
            StoreError::NotFound { .. } => ErrorKind::NotFound.into(),
            StoreError::PermissionDenied { .. } => ErrorKind::DeleteAccessDenied.into(),
            StoreError::PathEscapesRoot { .. } => escapes_root(),
            other => internal("delete", path, other),
        })?;
        Ok(empty_response())
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

/// Truncate `item` and replace its content with `data`.
fn write_to_file(item: &Item, path: &str, data: &str) -> Result<(), ApiError> {
    let mut stream = item
        .open(OpenMode::Write)
        .map_err(|e| write_error("open", path, e))?;
    stream
        .write_all(data.as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|e| write_error("write", path, StoreError::from_io(path, e)))
}

/// The request path, percent-decoded and stripped of surrounding slashes.
///
/// Paths that do not decode to UTF-8 are rejected rather than patched up,
/// since a replacement character could name a different file.
fn request_path(uri: &Uri) -> Result<String, ApiError> {
    let decoded = percent_decode_str(uri.path()).decode_utf8().map_err(|e| {
        log::debug!("rejecting path {}: {}", uri.path(), e);
        ApiError::bad_input("the requested path is not valid UTF-8.")
    })?;
    Ok(decoded.trim_matches('/').to_string())
}

fn populate_requested(uri: &Uri) -> bool {
    uri.query().is_some_and(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .any(|(key, value)| key == POPULATE_DATA && value == "true")
    })
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        log::debug!("rejecting request body: {}", e);
        ApiError::from(ErrorKind::BadInput)
    })
}

fn lookup_error(op: &str, path: &str, error: StoreError) -> ApiError {
    match error {
        StoreError::NotFound { .. } => ErrorKind::NotFound.into(),
        StoreError::PathEscapesRoot { .. } => escapes_root(),
        other => internal(op, path, other),
    }
}

fn write_error(op: &str, path: &str, error: StoreError) -> ApiError {
    match error {
        StoreError::PermissionDenied { .. } => ErrorKind::WriteAccessDenied.into(),
        StoreError::AlreadyExists { .. } => ErrorKind::FileAlreadyExists.into(),
        StoreError::NotFound { .. } => ErrorKind::NotFound.into(),
        StoreError::NotAFile { .. } => ErrorKind::FileExpected.into(),
        StoreError::PathEscapesRoot { .. } => escapes_root(),
        other => internal(op, path, other),
    }
}

fn escapes_root() -> ApiError {
    ApiError::bad_input("the requested path points outside the served directory.")
}

fn internal(op: &str, path: &str, error: StoreError) -> ApiError {
    log::error!("{} /{} failed: {}", op, path, error);
    ApiError::internal()
}

fn json_response<T: Serialize>(value: &T) -> Result<Response<Bytes>, ApiError> {
    let body = serde_json::to_vec(value).map_err(|e| {
        log::error!("failed to encode response: {}", e);
        ApiError::internal()
    })?;

    let mut response = Response::new(Bytes::from(body));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

fn empty_response() -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = StatusCode::OK;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    use serde_json::{json, Value};
    use treefs_store::{
        ItemKind, MemoryStore, Opener, Permission, Result as StoreResult, Stream, Viewer,
    };

    use crate::types::ErrorBody;

    fn request(method: Method, uri: &str, body: &str) -> Request<Bytes> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::from(body.to_string()))
            .unwrap()
    }

    fn send(handler: &Handler, method: Method, uri: &str, body: &str) -> Response<Bytes> {
        handler.handle(request(method, uri, body))
    }

    fn json_body(response: &Response<Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    fn error_id(response: &Response<Bytes>) -> String {
        let body: ErrorBody = serde_json::from_slice(response.body()).unwrap();
        body.id
    }

    fn seeded() -> MemoryStore {
        MemoryStore::new()
            .with_owner("alice")
            .with_file("a.txt", "hi")
            .unwrap()
            .with_file("sub/b.txt", "nested")
            .unwrap()
            .with_dir("sub/inner")
            .unwrap()
    }

    #[test]
    fn create_get_delete_scenario() {
        let handler = Handler::new(MemoryStore::new());

        let response = send(
            &handler,
            Method::POST,
            "/a.txt",
            r#"{"type":"file","data":"hi"}"#,
        );
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().is_empty());

        let response = send(&handler, Method::GET, "/a.txt", "");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(&response);
        assert_eq!(body["name"], "a.txt");
        assert_eq!(body["type"], "file");
        assert_eq!(body["data"], "hi");
        assert_eq!(body["size"], 2);

        let response = send(&handler, Method::DELETE, "/a.txt", "");
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&handler, Method::GET, "/a.txt", "");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(error_id(&response), "not-found");
    }

    #[test]
    fn get_root_lists_children_without_data() {
        let handler = Handler::new(seeded());

        for uri in ["/", "/?populateData=false", "http://localhost/"] {
            let response = send(&handler, Method::GET, uri, "");
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.headers().get(CONTENT_TYPE).unwrap(),
                "application/json"
            );

            let body = json_body(&response);
            assert_eq!(body["type"], "dir");
            assert!(body.get("data").is_none());
            let children = body["children"].as_array().unwrap();
            assert_eq!(children.len(), 2);
            assert_eq!(children[0]["name"], "a.txt");
            assert_eq!(children[0]["owner"], "alice");
            assert!(children[0].get("data").is_none());
            assert_eq!(children[1]["name"], "sub");
            assert_eq!(children[1]["type"], "dir");
            assert!(children[1].get("children").is_none());
        }
    }

    #[test]
    fn populate_data_fills_child_files() {
        let handler = Handler::new(seeded());

        let response = send(&handler, Method::GET, "/sub?populateData=true", "");
        let body = json_body(&response);
        let children = body["children"].as_array().unwrap();
        assert_eq!(children[0]["name"], "b.txt");
        assert_eq!(children[0]["data"], "nested");
        assert_eq!(children[1]["name"], "inner");
        assert!(children[1].get("data").is_none());

        for uri in ["/sub?populateData=false", "/sub?populateData=1", "/sub?other=true"] {
            let body = json_body(&send(&handler, Method::GET, uri, ""));
            assert!(body["children"][0].get("data").is_none(), "{}", uri);
        }
    }

    #[test]
    fn paths_are_percent_decoded() {
        let handler = Handler::new(MemoryStore::new().with_file("my file.txt", "x").unwrap());
        let response = send(&handler, Method::GET, "/my%20file.txt/", "");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(&response)["name"], "my file.txt");
    }

    #[test]
    fn paths_must_decode_to_utf8() {
        let handler = Handler::new(
            MemoryStore::new()
                .with_file("\u{fffd}", "replacement")
                .unwrap()
                .with_file("caf\u{e9}", "coffee")
                .unwrap(),
        );

        for method in [Method::GET, Method::PUT, Method::POST, Method::DELETE] {
            let response = send(&handler, method.clone(), "/%FF", r#"{"type":"file","data":"x"}"#);
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", method);
            assert_eq!(error_id(&response), "bad-input", "{}", method);
        }
        let body = json_body(&send(&handler, Method::GET, "/%EF%BF%BD", ""));
        assert_eq!(body["data"], "replacement");

        let body = json_body(&send(&handler, Method::GET, "/caf%C3%A9", ""));
        assert_eq!(body["data"], "coffee");
    }

    #[test]
    fn put_replaces_content() {
        let handler = Handler::new(seeded());

        for data in ["hello", "goodbye", "x"] {
            let body = json!({ "data": data }).to_string();
            let response = send(&handler, Method::PUT, "/a.txt", &body);
            assert_eq!(response.status(), StatusCode::OK);

            let body = json_body(&send(&handler, Method::GET, "/a.txt", ""));
            assert_eq!(body["data"], data);
        }
    }

    #[test]
    fn put_failures() {
        let handler = Handler::new(seeded());

        let response = send(&handler, Method::PUT, "/sub", r#"{"data":"x"}"#);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_id(&response), "file-expected");

        let response = send(&handler, Method::PUT, "/missing.txt", r#"{"data":"x"}"#);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(error_id(&response), "not-found");

        let response = send(&handler, Method::PUT, "/a.txt", "not json");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_id(&response), "bad-input");

        // Rejected bodies leave the content alone.
        let body = json_body(&send(&handler, Method::GET, "/a.txt", ""));
        assert_eq!(body["data"], "hi");
    }

    #[test]
    fn post_creates_directories() {
        let handler = Handler::new(MemoryStore::new());

        let response = send(&handler, Method::POST, "/a/b/c", r#"{"type":"dir"}"#);
        assert_eq!(response.status(), StatusCode::OK);

        for uri in ["/a", "/a/b", "/a/b/c"] {
            let body = json_body(&send(&handler, Method::GET, uri, ""));
            assert_eq!(body["type"], "dir", "{}", uri);
        }
    }

    #[test]
    fn post_failures() {
        let handler = Handler::new(seeded());

        let cases = [
            ("/a.txt", r#"{"type":"file","data":"again"}"#, "file-already-exists"),
            ("/new.txt", "{", "bad-input"),
            ("/new.txt", "", "bad-input"),
            ("/new.txt", r#"{"type":"pipe"}"#, "bad-input"),
            ("/new.txt", r#"{"data":"no type"}"#, "bad-input"),
        ];
        for (uri, body, id) in cases {
            let response = send(&handler, Method::POST, uri, body);
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{} {}", uri, body);
            assert_eq!(error_id(&response), id, "{} {}", uri, body);
        }

        let response = send(&handler, Method::POST, "/new.txt", r#"{"type":"pipe"}"#);
        let body: ErrorBody = serde_json::from_slice(response.body()).unwrap();
        assert!(body.user_message.starts_with("invalid type"));

        let response = send(&handler, Method::GET, "/new.txt", "");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(&send(&handler, Method::GET, "/a.txt", ""));
        assert_eq!(body["data"], "hi");
    }

    #[test]
    fn read_only_store_denies_mutations() {
        let handler = Handler::new(seeded().read_only());

        let response = send(&handler, Method::POST, "/new.txt", r#"{"type":"file"}"#);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(error_id(&response), "write-access-denied");

        let response = send(&handler, Method::POST, "/newdir", r#"{"type":"dir"}"#);
        assert_eq!(error_id(&response), "write-access-denied");

        let response = send(&handler, Method::PUT, "/a.txt", r#"{"data":"x"}"#);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(error_id(&response), "write-access-denied");

        let response = send(&handler, Method::DELETE, "/a.txt", "");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(error_id(&response), "delete-access-denied");

        // Reads still work.
        let response = send(&handler, Method::GET, "/a.txt", "");
        assert_eq!(json_body(&response)["data"], "hi");
    }

    #[test]
    fn delete_removes_subtree() {
        let handler = Handler::new(seeded());

        assert_eq!(send(&handler, Method::DELETE, "/sub", "").status(), StatusCode::OK);
        for uri in ["/sub", "/sub/b.txt", "/sub/inner"] {
            let response = send(&handler, Method::GET, uri, "");
            assert_eq!(error_id(&response), "not-found", "{}", uri);
        }

        let response = send(&handler, Method::DELETE, "/sub", "");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(error_id(&response), "not-found");

        let response = send(&handler, Method::DELETE, "/", "");
        assert_eq!(error_id(&response), "delete-access-denied");
    }

    #[test]
    fn escaping_paths_are_bad_input() {
        let handler = Handler::new(seeded());

        for method in [Method::GET, Method::PUT, Method::POST, Method::DELETE] {
            let response = send(&handler, method.clone(), "/../etc/passwd", r#"{"type":"file","data":""}"#);
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", method);
            assert_eq!(error_id(&response), "bad-input", "{}", method);
        }
    }

    #[test]
    fn unsupported_methods_are_rejected() {
        let handler = Handler::new(seeded());

        for method in [Method::PATCH, Method::HEAD, Method::OPTIONS] {
            let response = send(&handler, method.clone(), "/a.txt", "");
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", method);
        }
        let response = send(&handler, Method::PATCH, "/a.txt", "");
        let body: ErrorBody = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.id, "method-not-allowed");
        assert_eq!(body.user_message, "Invalid request.");
    }

    #[derive(Debug)]
    struct BrokenOpener;

    impl Opener for BrokenOpener {
        fn open(&self, _mode: OpenMode) -> StoreResult<Box<dyn Stream>> {
            Err(StoreError::Io {
                path: "broken".to_string(),
                source: io::Error::other("disk on fire"),
            })
        }
    }

    /// A directory holding one file whose content can never be read.
    struct BrokenStore;

    impl BrokenStore {
        fn broken_file() -> Item {
            Item {
                name: "broken".to_string(),
                permission: Permission::from_mode(0o644),
                owner: String::new(),
                size: 3,
                kind: ItemKind::Regular {
                    opener: Arc::new(BrokenOpener),
                },
            }
        }
    }

    impl Viewer for BrokenStore {
        fn get(&self, path: &str) -> StoreResult<Item> {
            match path {
                "" => Ok(Item {
                    name: "root".to_string(),
                    permission: Permission::from_mode(0o755),
                    owner: String::new(),
                    size: 0,
                    kind: ItemKind::Directory {
                        children: Some(vec![Self::broken_file()]),
                    },
                }),
                "broken" => Ok(Self::broken_file()),
                _ => Err(StoreError::NotFound {
                    path: path.to_string(),
                }),
            }
        }
    }

    impl Editor for BrokenStore {
        fn create_file(&self, path: &str) -> StoreResult<Item> {
            Err(StoreError::Io {
                path: path.to_string(),
                source: io::Error::other("read-only medium"),
            })
        }

        fn create_dir(&self, path: &str) -> StoreResult<Item> {
            self.create_file(path)
        }

        fn delete(&self, path: &str) -> StoreResult<()> {
            self.create_file(path).map(|_| ())
        }
    }

    /// Creates files normally but hands out openers that always fail.
    struct UnwritableFiles(MemoryStore);

    impl Viewer for UnwritableFiles {
        fn get(&self, path: &str) -> StoreResult<Item> {
            self.0.get(path)
        }
    }

    impl Editor for UnwritableFiles {
        fn create_file(&self, path: &str) -> StoreResult<Item> {
            let mut item = self.0.create_file(path)?;
            item.kind = ItemKind::Regular {
                opener: Arc::new(BrokenOpener),
            };
            Ok(item)
        }

        fn create_dir(&self, path: &str) -> StoreResult<Item> {
            self.0.create_dir(path)
        }

        fn delete(&self, path: &str) -> StoreResult<()> {
            self.0.delete(path)
        }
    }

    #[test]
    fn failed_initial_write_removes_the_new_file() {
        let handler = Handler::new(UnwritableFiles(MemoryStore::new()));

        for _ in 0..2 {
            let response = send(
                &handler,
                Method::POST,
                "/a.txt",
                r#"{"type":"file","data":"hi"}"#,
            );
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(error_id(&response), "internal-server-error");

            let response = send(&handler, Method::GET, "/a.txt", "");
            assert_eq!(error_id(&response), "not-found");
        }
    }

    #[test]
    fn unclassified_failures_are_internal() {
        let handler = Handler::new(BrokenStore);

        let response = send(&handler, Method::GET, "/broken", "");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.id, "internal-server-error");
        assert!(!body.system_message.contains("disk on fire"));

        // Listing without content is fine, populating aborts the whole tree.
        assert_eq!(send(&handler, Method::GET, "/", "").status(), StatusCode::OK);
        let response = send(&handler, Method::GET, "/?populateData=true", "");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = send(&handler, Method::PUT, "/broken", r#"{"data":"x"}"#);
        assert_eq!(error_id(&response), "internal-server-error");

        let response = send(&handler, Method::DELETE, "/broken", "");
        assert_eq!(error_id(&response), "internal-server-error");

        let response = send(&handler, Method::POST, "/x", r#"{"type":"dir"}"#);
        assert_eq!(error_id(&response), "internal-server-error");
    }
}

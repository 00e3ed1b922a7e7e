use reqwest::blocking::{Client, RequestBuilder, Response};
use url::Url;

use crate::error::Error;
use crate::types::{CreateRequest, ErrorBody, WireItem, WriteRequest};

/// A blocking client for a tree server.
///
/// Paths are relative to the served root; leading and trailing slashes are
/// ignored and every segment is percent-encoded.
///
/// # Example
///
/// ```no_run
/// use treefs_http::TreeClient;
///
/// let client = TreeClient::new("http://127.0.0.1:6000")?;
/// client.create_file("notes/todo.txt", "buy milk")?;
///
/// let item = client.get("notes/todo.txt", false)?;
/// assert_eq!(item.data.as_deref(), Some("buy milk"));
/// # Ok::<(), treefs_http::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct TreeClient {
    client: Client,
    base_url: Url,
}

impl TreeClient {
    pub fn new(base_url: &str) -> Result<Self, Error> {
        Self::with_client(Client::new(), base_url)
    }

    /// Use a preconfigured reqwest client (timeouts, TLS settings...).
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl {
                message: format!("{} cannot be used as a base URL", base_url),
            });
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the item at `path`.
    pub fn get(&self, path: &str, populate_data: bool) -> Result<WireItem, Error> {
        let body = self.get_raw(path, populate_data)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch the item at `path` and return the response body untouched.
    pub fn get_raw(&self, path: &str, populate_data: bool) -> Result<String, Error> {
        let url = self.url(path, populate_data)?;
        let response = self.send(self.client.get(url))?;
        Ok(response.text()?)
    }

    pub fn create_file(&self, path: &str, data: &str) -> Result<(), Error> {
        let url = self.url(path, false)?;
        self.send(self.client.post(url).json(&CreateRequest::file(data)))?;
        Ok(())
    }

    pub fn create_dir(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path, false)?;
        self.send(self.client.post(url).json(&CreateRequest::dir()))?;
        Ok(())
    }

    /// Replace the content of the file at `path`.
    pub fn write(&self, path: &str, data: &str) -> Result<(), Error> {
        let url = self.url(path, false)?;
        let request = WriteRequest {
            data: data.to_string(),
        };
        self.send(self.client.put(url).json(&request))?;
        Ok(())
    }

    pub fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path, false)?;
        self.send(self.client.delete(url))?;
        Ok(())
    }

    fn url(&self, path: &str, populate_data: bool) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl {
                message: format!("{} cannot be used as a base URL", self.base_url),
            })?
            .pop_if_empty()
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        if populate_data {
            url.query_pairs_mut().append_pair("populateData", "true");
        }
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, Error> {
        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text()?;
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => Err(Error::Api {
                status: status.as_u16(),
                body,
            }),
            Err(_) => Err(Error::UnexpectedResponse {
                status: status.as_u16(),
                body: text,
            }),
        }
    }
}

//! MAST (Mikulski Archive for Space Telescopes) HTTP client.
//!
//! Talks to the `invoke` service API for name resolution, cone search and
//! product listing, and to the download API for files.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;

use super::{Archive, Observation, ObservationTable, Product};
use crate::error::ArchiveError;

pub const MAST_BASE_URL: &str = "https://mast.stsci.edu";
const INVOKE_PATH: &str = "/api/v0/invoke";
const DOWNLOAD_PATH: &str = "/api/v0.1/Download/file";

/// Default per-request timeout, matching the archive's slowest cone searches
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1200);

const PAGE_SIZE: u32 = 50_000;

#[derive(Clone)]
pub struct MastClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl MastClient {
    pub fn new(timeout: Duration) -> Result<Self, ArchiveError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("jwst-view/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: MAST_BASE_URL.to_string(),
            timeout,
            poll_interval: Duration::from_secs(1),
        })
    }

    /// Point the client at another host (mirrors, test servers).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Submit a service request, re-polling while the archive reports it is
    /// still executing.
    async fn invoke(&self, service: &str, params: Value) -> Result<Value, ArchiveError> {
        let url = format!("{}{}", self.base_url, INVOKE_PATH);
        let request = json!({
            "service": service,
            "params": params,
            "format": "json",
            "pagesize": PAGE_SIZE,
            "page": 1,
            "removenullcolumns": true,
        })
        .to_string();

        let deadline = Instant::now() + self.timeout;

        loop {
            tracing::debug!("MAST request: {}", service);
            let response = self
                .client
                .post(&url)
                .header(ACCEPT, "text/plain")
                .form(&[("request", request.as_str())])
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::GATEWAY_TIMEOUT || status == StatusCode::REQUEST_TIMEOUT {
                return Err(ArchiveError::Timeout(format!("{service} returned HTTP {status}")));
            }
            if !status.is_success() {
                return Err(ArchiveError::Request(format!("{service} returned HTTP {status}")));
            }

            let body: Value = response.json().await?;
            match body.get("status").and_then(Value::as_str) {
                Some("EXECUTING") => {
                    if Instant::now() >= deadline {
                        return Err(ArchiveError::Timeout(format!(
                            "{service} still executing after {}s",
                            self.timeout.as_secs()
                        )));
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
                Some("ERROR") => {
                    let msg = body
                        .get("msg")
                        .and_then(Value::as_str)
                        .unwrap_or("no message")
                        .to_string();
                    return Err(ArchiveError::Response(format!("{service}: {msg}")));
                }
                _ => return Ok(body),
            }
        }
    }

    async fn resolve_name(&self, name: &str) -> Result<(f64, f64), ArchiveError> {
        let body = self
            .invoke("Mast.Name.Lookup", json!({ "input": name, "format": "json" }))
            .await?;

        let coord = body
            .get("resolvedCoordinate")
            .and_then(|c| c.get(0))
            .ok_or_else(|| ArchiveError::Response(format!("could not resolve '{name}'")))?;

        let ra = coord.get("ra").and_then(Value::as_f64);
        let dec = coord.get("decl").and_then(Value::as_f64);
        match (ra, dec) {
            (Some(ra), Some(dec)) => Ok((ra, dec)),
            _ => Err(ArchiveError::Response(format!(
                "resolved coordinate for '{name}' has no ra/decl"
            ))),
        }
    }
}

fn parse_table(body: &Value) -> Result<ObservationTable, ArchiveError> {
    let columns = body
        .get("fields")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let rows = parse_rows::<Observation>(body)?;
    Ok(ObservationTable { columns, rows })
}

fn parse_rows<T: serde::de::DeserializeOwned>(body: &Value) -> Result<Vec<T>, ArchiveError> {
    let data = match body.get("data") {
        Some(Value::Array(rows)) => rows,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(other) => {
            return Err(ArchiveError::Response(format!(
                "expected data array, got {other}"
            )))
        }
    };

    data.iter()
        .map(|row| {
            serde_json::from_value(row.clone())
                .map_err(|e| ArchiveError::Response(format!("malformed row: {e}")))
        })
        .collect()
}

/// Copy the response body into `file`, returning the byte count
async fn stream_body(response: &mut reqwest::Response, file: &mut tokio::fs::File) -> Result<u64, ArchiveError> {
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

#[async_trait]
impl Archive for MastClient {
    async fn query_object(&self, name: &str, radius_deg: f64) -> Result<ObservationTable, ArchiveError> {
        let (ra, dec) = self.resolve_name(name).await?;
        tracing::debug!("Resolved '{}' to RA={:.5} Dec={:.5}", name, ra, dec);

        let body = self
            .invoke(
                "Mast.Caom.Cone",
                json!({ "ra": ra, "dec": dec, "radius": radius_deg }),
            )
            .await?;
        parse_table(&body)
    }

    async fn product_list(&self, observation: &Observation) -> Result<Vec<Product>, ArchiveError> {
        let body = self
            .invoke("Mast.Caom.Products", json!({ "obsid": observation.obsid }))
            .await?;
        parse_rows(&body)
    }

    async fn download_product(&self, product: &Product, dest_dir: &Path) -> Result<PathBuf, ArchiveError> {
        let url = format!("{}{}", self.base_url, DOWNLOAD_PATH);
        let mut response = self
            .client
            .get(&url)
            .query(&[("uri", product.data_uri.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArchiveError::Request(format!(
                "download of {} returned HTTP {status}",
                product.data_uri
            )));
        }

        let filename = Path::new(&product.product_filename)
            .file_name()
            .ok_or_else(|| {
                ArchiveError::Response(format!("bad product filename '{}'", product.product_filename))
            })?;
        let local_path = dest_dir.join(filename);

        let mut file = tokio::fs::File::create(&local_path).await?;
        let written = match stream_body(&mut response, &mut file).await {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                if let Err(rm) = tokio::fs::remove_file(&local_path).await {
                    tracing::warn!("Failed to remove partial download {}: {}", local_path.display(), rm);
                }
                return Err(e);
            }
        };

        tracing::info!("Downloaded {} ({} bytes)", local_path.display(), written);
        Ok(local_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> MastClient {
        MastClient::new(Duration::from_secs(5))
            .unwrap()
            .with_base_url(&server.uri())
            .with_poll_interval(Duration::from_millis(10))
    }

    async fn mount_lookup(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path(INVOKE_PATH))
            .and(body_string_contains("Mast.Name.Lookup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resolvedCoordinate": [{"canonicalName": "M 16", "ra": 274.7, "decl": -13.8}],
                "status": ""
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_query_object_resolves_then_searches() {
        let server = MockServer::start().await;
        mount_lookup(&server).await;
        Mock::given(method("POST"))
            .and(path(INVOKE_PATH))
            .and(body_string_contains("Mast.Caom.Cone"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "COMPLETE",
                "fields": [{"name": "obsid"}, {"name": "obs_collection"}, {"name": "instrument_name"}],
                "data": [
                    {"obsid": "87602009", "obs_collection": "JWST", "instrument_name": "NIRCAM"},
                    {"obsid": 2003, "obs_collection": "HST", "instrument_name": "WFC3/UVIS"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let table = client.query_object("M16", 0.1).await.unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.has_column("instrument_name"));
        assert!(!table.has_column("dataproduct_type"));
        assert_eq!(table.rows[1].obsid, "2003");
    }

    #[tokio::test]
    async fn test_unresolvable_name_is_a_response_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INVOKE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resolvedCoordinate": [],
                "status": ""
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.query_object("Nowhere", 0.1).await.unwrap_err();
        assert!(matches!(err, ArchiveError::Response(_)));
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn test_executing_status_is_polled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INVOKE_PATH))
            .and(body_string_contains("Mast.Caom.Products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "EXECUTING"})))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(INVOKE_PATH))
            .and(body_string_contains("Mast.Caom.Products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "COMPLETE",
                "data": [{
                    "obsid": "87602009",
                    "productFilename": "jw02731_nrcb1_cal.fits",
                    "productSubGroupDescription": "CAL",
                    "dataURI": "mast:JWST/product/jw02731_nrcb1_cal.fits"
                }]
            })))
            .with_priority(2)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let observation = Observation {
            obsid: "87602009".into(),
            ..Default::default()
        };
        let products = client.product_list(&observation).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product_filename, "jw02731_nrcb1_cal.fits");
    }

    #[tokio::test]
    async fn test_error_status_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INVOKE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ERROR",
                "msg": "Invalid obsid"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.product_list(&Observation::default()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid obsid"));
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout_class() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INVOKE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "COMPLETE"}))
                    .set_delay(Duration::from_millis(800)),
            )
            .mount(&server)
            .await;

        let client = MastClient::new(Duration::from_millis(100))
            .unwrap()
            .with_base_url(&server.uri());
        let err = client.query_object("M16", 0.1).await.unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err:?}");
    }

    #[tokio::test]
    async fn test_gateway_timeout_is_timeout_class() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INVOKE_PATH))
            .respond_with(ResponseTemplate::new(504))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(client.query_object("M16", 0.1).await.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_download_streams_to_dest_dir() {
        let server = MockServer::start().await;
        let payload = vec![7u8; 4096];
        Mock::given(method("GET"))
            .and(path(DOWNLOAD_PATH))
            .and(query_param("uri", "mast:JWST/product/jw02731_nrcb1_cal.fits"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&server).await;
        let product = Product {
            obsid: "87602009".into(),
            product_filename: "jw02731_nrcb1_cal.fits".into(),
            product_sub_group_description: Some("CAL".into()),
            data_uri: "mast:JWST/product/jw02731_nrcb1_cal.fits".into(),
            ..Default::default()
        };

        let local = client.download_product(&product, dir.path()).await.unwrap();
        assert_eq!(local, dir.path().join("jw02731_nrcb1_cal.fits"));
        assert_eq!(std::fs::read(local).unwrap(), payload);
    }

    #[tokio::test]
    async fn test_truncated_download_leaves_no_partial_file() {
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        // Promises 4096 bytes, sends 100, then hangs up
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 4096\r\n\r\n")
                .await
                .unwrap();
            socket.write_all(&[7u8; 100]).await.unwrap();
            socket.flush().await.unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let client = MastClient::new(Duration::from_secs(5))
            .unwrap()
            .with_base_url(&format!("http://{}", addr));
        let product = Product {
            product_filename: "jw02731_nrcb1_cal.fits".into(),
            data_uri: "mast:JWST/product/jw02731_nrcb1_cal.fits".into(),
            ..Default::default()
        };

        let result = client.download_product(&product, dir.path()).await;
        server.await.unwrap();

        assert!(result.is_err());
        assert!(!dir.path().join("jw02731_nrcb1_cal.fits").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_download_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DOWNLOAD_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&server).await;
        let product = Product {
            product_filename: "missing_cal.fits".into(),
            data_uri: "mast:JWST/product/missing_cal.fits".into(),
            ..Default::default()
        };
        let err = client.download_product(&product, dir.path()).await.unwrap_err();
        assert!(matches!(err, ArchiveError::Request(_)));
        assert!(!dir.path().join("missing_cal.fits").exists());
    }
}

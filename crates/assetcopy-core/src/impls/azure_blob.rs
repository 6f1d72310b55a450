//! AzureBlobStore - Azure Blob Storage REST 実装
//!
//! `reqwest` で Blob REST API を直接呼び出します。
//!
//! # 認証
//! - リクエスト: Shared Key（アカウントキーによる HMAC-SHA256 署名）
//! - コピー元 URL: サービス SAS（blob 単位、読み取りのみ）
//!
//! # 使う API
//! - Create Container / Set Container ACL
//! - Get Blob Properties (HEAD) / Put Blob / List Blobs / Copy Blob
//! - Put Block / Put Block List（`BLOCK_SIZE` を超えるファイル）

use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Method, StatusCode};
use sha2::Sha256;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::config::AccountCredentials;
use crate::domain::{BlobRef, ContainerRef, CopyHandle, CopyStatus, PublicAccess};
use crate::ports::{BlobStore, StorageError};

/// REST API version used for requests and signed into SAS tokens.
pub const AZURE_API_VERSION: &str = "2023-11-03";

/// Blob names: encode everything except unreserved characters and '/'.
const BLOB_PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Query values: encode everything except unreserved characters.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Files larger than this are staged as blocks of this size.
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024;

type HmacSha256 = Hmac<Sha256>;

pub struct AzureBlobStore {
    client: reqwest::Client,
    account: String,
    key_bytes: Vec<u8>,
    base_url: String,
}

impl AzureBlobStore {
    /// Store for `https?://{account}.blob.core.windows.net`.
    pub fn new(credentials: &AccountCredentials) -> Result<Self, StorageError> {
        let scheme = if credentials.use_https { "https" } else { "http" };
        let base_url = format!("{scheme}://{}.blob.core.windows.net", credentials.name);
        Self::with_endpoint(credentials, base_url)
    }

    /// Store against an explicit endpoint (emulators, sovereign clouds).
    pub fn with_endpoint(
        credentials: &AccountCredentials,
        base_url: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let key_bytes = BASE64_STANDARD.decode(credentials.key.trim()).map_err(|e| {
            StorageError::Signing(format!(
                "account key for {} is not valid base64: {e}",
                credentials.name
            ))
        })?;
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .read_timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| StorageError::Request {
                operation: "client init",
                message: e.to_string(),
            })?;
        let base_url: String = base_url.into();

        Ok(Self {
            client,
            account: credentials.name.clone(),
            key_bytes,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Current UTC date in RFC 1123 format for the `x-ms-date` header.
    fn rfc1123_date(now: DateTime<Utc>) -> String {
        now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
    }

    /// Percent-encoded resource path: `container` or `container/blob`.
    fn resource_path(container: &ContainerRef, blob: Option<&str>) -> String {
        match blob {
            Some(blob) => format!(
                "{}/{}",
                container.name(),
                utf8_percent_encode(blob, BLOB_PATH_ENCODE_SET)
            ),
            None => container.name().to_string(),
        }
    }

    fn hmac_base64(&self, message: &str) -> Result<String, StorageError> {
        let mut mac = HmacSha256::new_from_slice(&self.key_bytes)
            .map_err(|e| StorageError::Signing(format!("HMAC key error: {e}")))?;
        mac.update(message.as_bytes());
        Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Shared Key string-to-sign.
    ///
    /// ```text
    /// VERB, Content-Encoding, Content-Language, Content-Length, Content-MD5,
    /// Content-Type, Date, If-Modified-Since, If-Match, If-None-Match,
    /// If-Unmodified-Since, Range, CanonicalizedHeaders, CanonicalizedResource
    /// ```
    fn string_to_sign(
        &self,
        method: &Method,
        resource_path: &str,
        content_length: usize,
        content_type: &str,
        ms_headers: &[(String, String)],
        query: &[(&str, String)],
    ) -> String {
        // zero length is signed as the empty string
        let content_length = if content_length == 0 {
            String::new()
        } else {
            content_length.to_string()
        };

        let mut headers: Vec<(String, &str)> = ms_headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.as_str()))
            .collect();
        headers.sort_by(|a, b| a.0.cmp(&b.0));
        let canonicalized_headers = headers
            .iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join("\n");

        let mut canonicalized_resource = format!("/{}/{}", self.account, resource_path);
        let mut params: Vec<(String, &str)> = query
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.as_str()))
            .collect();
        params.sort_by(|a, b| a.0.cmp(&b.0));
        for (k, v) in &params {
            canonicalized_resource.push_str(&format!("\n{k}:{v}"));
        }

        [
            method.as_str(),
            "",
            "",
            content_length.as_str(),
            "",
            content_type,
            "",
            "",
            "",
            "",
            "",
            "",
            canonicalized_headers.as_str(),
            canonicalized_resource.as_str(),
        ]
        .join("\n")
    }

    /// Service SAS string-to-sign for a single blob (versions 2020-12-06 and later).
    fn sas_string_to_sign(&self, container: &ContainerRef, blob: &str, expiry: &str) -> String {
        let canonicalized_resource = format!("/blob/{}/{}/{}", self.account, container, blob);
        [
            "r",
            "",
            expiry,
            canonicalized_resource.as_str(),
            "",
            "",
            "",
            AZURE_API_VERSION,
            "b",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
        ]
        .join("\n")
    }

    fn url(&self, resource_path: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{}/{}", self.base_url, resource_path);
        for (i, (k, v)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(k);
            url.push('=');
            url.push_str(&utf8_percent_encode(v, QUERY_ENCODE_SET).to_string());
        }
        url
    }

    /// Sign and send one request. Status handling is left to the caller.
    #[allow(clippy::too_many_arguments)]
    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        resource_path: &str,
        query: &[(&str, String)],
        extra_headers: &[(&str, String)],
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<reqwest::Response, StorageError> {
        let date = Self::rfc1123_date(Utc::now());
        let mut ms_headers = vec![
            ("x-ms-date".to_string(), date),
            ("x-ms-version".to_string(), AZURE_API_VERSION.to_string()),
        ];
        for (k, v) in extra_headers {
            ms_headers.push((k.to_string(), v.clone()));
        }

        let string_to_sign = self.string_to_sign(
            &method,
            resource_path,
            body.len(),
            content_type,
            &ms_headers,
            query,
        );
        let signature = self.hmac_base64(&string_to_sign)?;

        let mut req = self
            .client
            .request(method, self.url(resource_path, query))
            .header("Authorization", format!("SharedKey {}:{}", self.account, signature))
            .header("Content-Length", body.len());
        for (k, v) in &ms_headers {
            req = req.header(k.as_str(), v.as_str());
        }
        if !content_type.is_empty() {
            req = req.header("Content-Type", content_type);
        }

        req.body(body)
            .send()
            .await
            .map_err(|e| StorageError::Request {
                operation,
                message: e.to_string(),
            })
    }

    /// Stage `reader` as blocks of `BLOCK_SIZE` and commit them in order.
    ///
    /// Only one block is held in memory at a time. Returns the number of bytes sent.
    async fn upload_blocks<R: AsyncRead + Unpin>(
        &self,
        resource_path: &str,
        reader: &mut R,
    ) -> Result<u64, StorageError> {
        let mut ids = Vec::new();
        let mut total = 0u64;
        let mut buf = vec![0u8; BLOCK_SIZE];
        loop {
            let n = read_block(reader, &mut buf).await?;
            if n == 0 {
                break;
            }
            let id = block_id(ids.len());
            let resp = self
                .send(
                    "put block",
                    Method::PUT,
                    resource_path,
                    &[("comp", "block".to_string()), ("blockid", id.clone())],
                    &[],
                    "application/octet-stream",
                    buf[..n].to_vec(),
                )
                .await?;
            if !resp.status().is_success() {
                return Err(Self::status_error("put block", resp).await);
            }
            total += n as u64;
            ids.push(id);
        }

        let resp = self
            .send(
                "put block list",
                Method::PUT,
                resource_path,
                &[("comp", "blocklist".to_string())],
                &[],
                "application/xml",
                block_list_xml(&ids).into_bytes(),
            )
            .await?;
        if !resp.status().is_success() {
            return Err(Self::status_error("put block list", resp).await);
        }
        debug!(resource = resource_path, blocks = ids.len(), size = total, "committed block list");
        Ok(total)
    }

    async fn status_error(operation: &'static str, resp: reqwest::Response) -> StorageError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        StorageError::Status {
            operation,
            status,
            body,
        }
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    fn account(&self) -> &str {
        &self.account
    }

    async fn create_container_if_not_exists(
        &self,
        container: &ContainerRef,
    ) -> Result<bool, StorageError> {
        debug!(account = %self.account, %container, "create container");
        let resp = self
            .send(
                "create container",
                Method::PUT,
                &Self::resource_path(container, None),
                &[("restype", "container".to_string())],
                &[],
                "",
                Vec::new(),
            )
            .await?;

        match resp.status() {
            StatusCode::CREATED => Ok(true),
            StatusCode::CONFLICT => Ok(false),
            _ => Err(Self::status_error("create container", resp).await),
        }
    }

    async fn set_public_access(
        &self,
        container: &ContainerRef,
        access: PublicAccess,
    ) -> Result<(), StorageError> {
        debug!(account = %self.account, %container, ?access, "set container acl");
        let mut headers = Vec::new();
        if let Some(value) = access.header_value() {
            headers.push(("x-ms-blob-public-access", value.to_string()));
        }
        let resp = self
            .send(
                "set container acl",
                Method::PUT,
                &Self::resource_path(container, None),
                &[
                    ("restype", "container".to_string()),
                    ("comp", "acl".to_string()),
                ],
                &headers,
                "",
                Vec::new(),
            )
            .await?;

        if !resp.status().is_success() {
            return Err(Self::status_error("set container acl", resp).await);
        }
        Ok(())
    }

    async fn exists(&self, container: &ContainerRef, blob: &str) -> Result<bool, StorageError> {
        let resp = self
            .send(
                "blob exists",
                Method::HEAD,
                &Self::resource_path(container, Some(blob)),
                &[],
                &[],
                "",
                Vec::new(),
            )
            .await?;

        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::status_error("blob exists", resp).await),
        }
    }

    async fn upload_file(
        &self,
        container: &ContainerRef,
        blob: &str,
        path: &Path,
    ) -> Result<BlobRef, StorageError> {
        let mut file = tokio::fs::File::open(path).await?;
        let resource = Self::resource_path(container, Some(blob));
        if file.metadata().await?.len() > BLOCK_SIZE as u64 {
            debug!(account = %self.account, %container, blob, "put blocks");
            let size = self.upload_blocks(&resource, &mut file).await?;
            return Ok(BlobRef::new(container.clone(), blob, size));
        }

        let mut data = Vec::new();
        file.read_to_end(&mut data).await?;
        let size = data.len() as u64;
        debug!(account = %self.account, %container, blob, size, "put blob");

        let resp = self
            .send(
                "upload",
                Method::PUT,
                &resource,
                &[],
                &[("x-ms-blob-type", "BlockBlob".to_string())],
                "application/octet-stream",
                data,
            )
            .await?;

        if !resp.status().is_success() {
            return Err(Self::status_error("upload", resp).await);
        }
        Ok(BlobRef::new(container.clone(), blob, size))
    }

    async fn list_blobs(&self, container: &ContainerRef) -> Result<Vec<BlobRef>, StorageError> {
        let mut blobs = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut query = vec![
                ("restype", "container".to_string()),
                ("comp", "list".to_string()),
            ];
            if let Some(m) = &marker {
                query.push(("marker", m.clone()));
            }

            let resp = self
                .send(
                    "list blobs",
                    Method::GET,
                    &Self::resource_path(container, None),
                    &query,
                    &[],
                    "",
                    Vec::new(),
                )
                .await?;
            if !resp.status().is_success() {
                return Err(Self::status_error("list blobs", resp).await);
            }
            let body = resp.text().await.map_err(|e| StorageError::Request {
                operation: "list blobs",
                message: e.to_string(),
            })?;

            let page = parse_list_blobs(&body)?;
            blobs.extend(
                page.blobs
                    .into_iter()
                    .map(|(name, size)| BlobRef::new(container.clone(), name, size)),
            );

            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        debug!(account = %self.account, %container, count = blobs.len(), "listed blobs");
        Ok(blobs)
    }

    fn blob_url(&self, container: &ContainerRef, blob: &str) -> String {
        format!(
            "{}/{}",
            self.base_url,
            Self::resource_path(container, Some(blob))
        )
    }

    fn read_signature(
        &self,
        container: &ContainerRef,
        blob: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        let expiry = expires_at.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let signature = self.hmac_base64(&self.sas_string_to_sign(container, blob, &expiry))?;

        Ok(format!(
            "?sv={}&sr=b&sp=r&se={}&sig={}",
            AZURE_API_VERSION,
            utf8_percent_encode(&expiry, QUERY_ENCODE_SET),
            utf8_percent_encode(&signature, QUERY_ENCODE_SET)
        ))
    }

    async fn start_copy(
        &self,
        container: &ContainerRef,
        blob: &str,
        source_url: &str,
    ) -> Result<CopyHandle, StorageError> {
        let resp = self
            .send(
                "copy",
                Method::PUT,
                &Self::resource_path(container, Some(blob)),
                &[],
                &[("x-ms-copy-source", source_url.to_string())],
                "",
                Vec::new(),
            )
            .await?;

        if !resp.status().is_success() {
            return Err(Self::status_error("copy", resp).await);
        }

        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let status = header("x-ms-copy-status")
            .as_deref()
            .and_then(CopyStatus::parse)
            .unwrap_or(CopyStatus::Pending);

        Ok(CopyHandle {
            copy_id: header("x-ms-copy-id"),
            status,
        })
    }
}

/// One page of a List Blobs response: `(name, content length)` pairs and the continuation marker.
#[derive(Debug, Default, PartialEq, Eq)]
struct ListPage {
    blobs: Vec<(String, u64)>,
    next_marker: Option<String>,
}

fn parse_list_blobs(body: &str) -> Result<ListPage, StorageError> {
    let mut page = ListPage {
        next_marker: tag_text(body, "NextMarker")
            .filter(|m| !m.is_empty())
            .map(xml_unescape),
        ..ListPage::default()
    };

    let mut rest = body;
    while let Some(start) = rest.find("<Blob>") {
        let after = &rest[start + "<Blob>".len()..];
        let end = after
            .find("</Blob>")
            .ok_or_else(|| StorageError::InvalidResponse("unterminated <Blob>".into()))?;
        let blob_xml = &after[..end];

        let name = tag_text(blob_xml, "Name")
            .ok_or_else(|| StorageError::InvalidResponse("<Blob> without <Name>".into()))?;
        let size = match tag_text(blob_xml, "Content-Length") {
            Some(v) => v.trim().parse::<u64>().map_err(|e| {
                StorageError::InvalidResponse(format!("bad Content-Length {v:?}: {e}"))
            })?,
            None => 0,
        };
        page.blobs.push((xml_unescape(name), size));

        rest = &after[end + "</Blob>".len()..];
    }

    Ok(page)
}

fn tag_text<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)?;
    Some(&xml[start..start + end])
}

/// Decode the five predefined entities and numeric references in one pass.
/// Anything unrecognised is kept as written.
fn xml_unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .and_then(|semi| entity_char(&tail[1..semi]).map(|c| (c, semi + 1)));
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity_char(entity: &str) -> Option<char> {
    match entity {
        "lt" => return Some('<'),
        "gt" => return Some('>'),
        "quot" => return Some('"'),
        "apos" => return Some('\''),
        "amp" => return Some('&'),
        _ => {}
    }
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}

/// Fill `buf` from `reader` until it is full or the reader is exhausted.
async fn read_block<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Block ids must all have the same length within one blob.
fn block_id(index: usize) -> String {
    BASE64_STANDARD.encode(format!("block-{index:06}"))
}

fn block_list_xml(ids: &[String]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<BlockList>\n");
    for id in ids {
        xml.push_str(&format!("  <Latest>{id}</Latest>\n"));
    }
    xml.push_str("</BlockList>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn store() -> AzureBlobStore {
        // "key" in base64
        let creds = AccountCredentials::new("acct", "a2V5", true);
        AzureBlobStore::new(&creds).unwrap()
    }

    #[test]
    fn base_url_follows_https_flag() {
        let http = AzureBlobStore::new(&AccountCredentials::new("acct", "a2V5", false)).unwrap();
        assert_eq!(http.base_url, "http://acct.blob.core.windows.net");
        assert_eq!(store().base_url, "https://acct.blob.core.windows.net");
    }

    #[test]
    fn invalid_key_is_rejected() {
        let creds = AccountCredentials::new("acct", "not base64!", true);
        assert!(matches!(
            AzureBlobStore::new(&creds),
            Err(StorageError::Signing(_))
        ));
    }

    #[test]
    fn rfc1123_date_format() {
        let at = Utc.with_ymd_and_hms(2024, 2, 26, 12, 34, 56).unwrap();
        assert_eq!(
            AzureBlobStore::rfc1123_date(at),
            "Mon, 26 Feb 2024 12:34:56 GMT"
        );
    }

    #[test]
    fn blob_url_encodes_spaces_but_keeps_slashes() {
        let url = store().blob_url(&ContainerRef::new("media"), "dir/my clip.ismv");
        assert_eq!(
            url,
            "https://acct.blob.core.windows.net/media/dir/my%20clip.ismv"
        );
    }

    #[test]
    fn shared_key_string_to_sign_layout() {
        let s = store().string_to_sign(
            &Method::PUT,
            "media/a.ismv",
            0,
            "",
            &[
                ("x-ms-version".into(), AZURE_API_VERSION.into()),
                ("x-ms-date".into(), "Mon, 26 Feb 2024 12:34:56 GMT".into()),
                ("x-ms-copy-source".into(), "https://src/a".into()),
            ],
            &[("restype", "container".into()), ("comp", "acl".into())],
        );
        let lines: Vec<&str> = s.split('\n').collect();

        assert_eq!(lines[0], "PUT");
        // zero content length is signed as empty
        assert_eq!(lines[3], "");
        // headers sorted by name
        assert_eq!(lines[12], "x-ms-copy-source:https://src/a");
        assert_eq!(lines[13], "x-ms-date:Mon, 26 Feb 2024 12:34:56 GMT");
        assert_eq!(lines[14], format!("x-ms-version:{AZURE_API_VERSION}"));
        // resource with sorted query params
        assert_eq!(lines[15], "/acct/media/a.ismv");
        assert_eq!(lines[16], "comp:acl");
        assert_eq!(lines[17], "restype:container");
    }

    #[test]
    fn sas_string_to_sign_has_sixteen_fields() {
        let s = store().sas_string_to_sign(
            &ContainerRef::new("streamingfiles"),
            "content.ism",
            "2024-01-02T00:00:00Z",
        );
        let fields: Vec<&str> = s.split('\n').collect();
        assert_eq!(fields.len(), 16);
        assert_eq!(fields[0], "r");
        assert_eq!(fields[2], "2024-01-02T00:00:00Z");
        assert_eq!(fields[3], "/blob/acct/streamingfiles/content.ism");
        assert_eq!(fields[7], AZURE_API_VERSION);
        assert_eq!(fields[8], "b");
    }

    #[test]
    fn read_signature_is_a_query_string_bound_to_expiry() {
        let s = store();
        let c = ContainerRef::new("streamingfiles");
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let sas = s.read_signature(&c, "content.ism", at).unwrap();
        assert!(sas.starts_with("?sv="));
        assert!(sas.contains("&sr=b&sp=r&"));
        assert!(sas.contains("se=2024-01-02T00%3A00%3A00Z"));

        let later = s
            .read_signature(&c, "content.ism", at + chrono::Duration::hours(1))
            .unwrap();
        assert_ne!(sas, later);
    }

    #[test]
    fn list_blobs_page_is_parsed() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="https://acct.blob.core.windows.net/" ContainerName="streamingfiles">
  <Blobs>
    <Blob><Name>content.ism</Name><Properties><Content-Length>1234</Content-Length></Properties></Blob>
    <Blob><Name>a&amp;b.ismv</Name><Properties><Content-Length>99</Content-Length></Properties></Blob>
  </Blobs>
  <NextMarker>2!80!MDAwMDE2</NextMarker>
</EnumerationResults>"#;

        let page = parse_list_blobs(xml).unwrap();
        assert_eq!(
            page.blobs,
            vec![("content.ism".to_string(), 1234), ("a&b.ismv".to_string(), 99)]
        );
        assert_eq!(page.next_marker.as_deref(), Some("2!80!MDAwMDE2"));
    }

    #[test]
    fn empty_next_marker_ends_paging() {
        let xml = "<EnumerationResults><Blobs /><NextMarker /></EnumerationResults>";
        let page = parse_list_blobs(xml).unwrap();
        assert!(page.blobs.is_empty());
        assert_eq!(page.next_marker, None);

        let xml = "<EnumerationResults><Blobs></Blobs><NextMarker></NextMarker></EnumerationResults>";
        assert_eq!(parse_list_blobs(xml).unwrap().next_marker, None);
    }

    #[test]
    fn malformed_length_is_an_error() {
        let xml = "<Blob><Name>x</Name><Properties><Content-Length>abc</Content-Length></Properties></Blob>";
        assert!(matches!(
            parse_list_blobs(xml),
            Err(StorageError::InvalidResponse(_))
        ));
    }

    #[rstest]
    #[case("a&#xD;b", "a\rb")]
    #[case("caf&#233;.ismv", "café.ismv")]
    #[case("tab&#X9;", "tab\t")]
    #[case("&amp;lt;", "&lt;")]
    #[case("&lt;&gt;&quot;&apos;", "<>\"'")]
    #[case("a & b", "a & b")]
    #[case("&bogus;&#xZZ;&#1114112;", "&bogus;&#xZZ;&#1114112;")]
    fn xml_unescape_decodes_entities(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(xml_unescape(input), expected);
    }

    #[test]
    fn numeric_reference_in_listed_name_is_decoded() {
        let xml = "<Blob><Name>line&#xD;break.ismv</Name><Properties><Content-Length>5</Content-Length></Properties></Blob>";
        let page = parse_list_blobs(xml).unwrap();
        assert_eq!(page.blobs, vec![("line\rbreak.ismv".to_string(), 5)]);
    }

    #[test]
    fn block_ids_share_one_length_and_keep_order() {
        let first = block_id(0);
        let last = block_id(49_999);
        assert_eq!(first.len(), last.len());
        assert!(first.len() <= 64);
        assert_eq!(BASE64_STANDARD.decode(&first).unwrap(), b"block-000000");
        assert_eq!(BASE64_STANDARD.decode(&last).unwrap(), b"block-049999");
    }

    #[test]
    fn block_list_commits_every_id_as_latest() {
        let ids = vec![block_id(0), block_id(1)];
        let xml = block_list_xml(&ids);
        assert_eq!(
            xml,
            format!(
                "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<BlockList>\n  <Latest>{}</Latest>\n  <Latest>{}</Latest>\n</BlockList>",
                ids[0], ids[1]
            )
        );
    }

    #[tokio::test]
    async fn read_block_fills_until_exhausted() {
        let data: &[u8] = b"0123456789";
        let mut reader = data;
        let mut buf = [0u8; 4];
        let mut sizes = Vec::new();
        let mut collected = Vec::new();
        loop {
            let n = read_block(&mut reader, &mut buf).await.unwrap();
            sizes.push(n);
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(sizes, [4, 4, 2, 0]);
        assert_eq!(collected, data);
    }

    #[test]
    fn put_block_signs_decoded_block_id() {
        let id = block_id(7);
        let s = store().string_to_sign(
            &Method::PUT,
            "media/big.ismv",
            BLOCK_SIZE,
            "application/octet-stream",
            &[],
            &[("comp", "block".into()), ("blockid", id.clone())],
        );
        let lines: Vec<&str> = s.split('\n').collect();
        assert_eq!(lines[3], BLOCK_SIZE.to_string());
        assert_eq!(lines[5], "application/octet-stream");
        assert_eq!(lines[lines.len() - 2], format!("blockid:{id}"));
        assert_eq!(lines[lines.len() - 1], "comp:block");
    }
}

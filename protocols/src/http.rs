//! # HTTP/1.1 Client Codec
//!
//! Just enough HTTP/1.1 to issue `GET` requests on a persistent connection
//! and read back responses. The head and the body can be read separately, so
//! a caller that only needs the status never waits on the body.
//!
//! Every individual read and write is bounded by the caller's I/O timeout so
//! a silent peer can never stall the caller beyond that bound.

use std::future::Future;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Longest status or header line accepted, in bytes.
pub const MAX_LINE: usize = 65_536;
/// Most header fields accepted in a single response head.
pub const MAX_HEADERS: usize = 100;

/// Most body bytes kept per response. Longer bodies are cut short and the
/// connection is not reused.
pub const MAX_BODY: usize = 1024 * 1024;

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection closed without response")]
    Closed,
    #[error("bad status line: {0:?}")]
    BadStatusLine(String),
    #[error("bad header line: {0:?}")]
    BadHeader(String),
    #[error("line longer than {MAX_LINE} bytes")]
    LineTooLong,
    #[error("more than {MAX_HEADERS} headers")]
    TooManyHeaders,
    #[error("bad chunk size: {0:?}")]
    BadChunk(String),
    #[error("bad content-length: {0:?}")]
    BadContentLength(String),
}

impl HttpError {
    /// Returns `true` when the peer misbehaved at the protocol level.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, HttpError::Io(_) | HttpError::Timeout(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

/// How the end of a response body is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Empty,
    Chunked,
    Length(u64),
    UntilClose,
}

/// Status line plus header fields of a response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: Version,
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Case-insensitive lookup of the first header named `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        is_success(self.status)
    }

    pub fn framing(&self) -> Result<Framing, HttpError> {
        if self.has_no_body() {
            return Ok(Framing::Empty);
        }
        if self.is_chunked() {
            return Ok(Framing::Chunked);
        }
        Ok(match self.content_length()? {
            Some(len) => Framing::Length(len),
            None => Framing::UntilClose,
        })
    }

    /// Whether another request may follow once the body has been read.
    pub fn can_reuse(&self) -> bool {
        self.status != 101
            && self.wants_keep_alive()
            && matches!(
                self.framing(),
                Ok(Framing::Empty | Framing::Chunked | Framing::Length(_))
            )
    }

    fn has_token(&self, name: &str, token: &str) -> bool {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .flat_map(|(_, value)| value.split(','))
            .any(|t| t.trim().eq_ignore_ascii_case(token))
    }

    fn wants_keep_alive(&self) -> bool {
        if self.has_token("connection", "close") {
            return false;
        }
        match self.version {
            Version::Http11 => true,
            Version::Http10 => self.has_token("connection", "keep-alive"),
        }
    }

    fn is_chunked(&self) -> bool {
        self.header("transfer-encoding")
            .and_then(|value| value.rsplit(',').next())
            .is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"))
    }

    fn content_length(&self) -> Result<Option<u64>, HttpError> {
        match self.header("content-length") {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| HttpError::BadContentLength(value.to_string())),
        }
    }

    fn has_no_body(&self) -> bool {
        (100..200).contains(&self.status) || self.status == 204 || self.status == 304
    }
}

/// A response with its body read, up to [`MAX_BODY`] bytes.
#[derive(Debug, Clone)]
pub struct Response {
    pub head: ResponseHead,
    pub body: Vec<u8>,
    /// Whether the connection may carry another request.
    pub keep_alive: bool,
}

impl Response {
    pub fn status(&self) -> u16 {
        self.head.status
    }

    pub fn is_success(&self) -> bool {
        self.head.is_success()
    }
}

/// Status codes in `[100, 300)` count as success.
pub fn is_success(status: u16) -> bool {
    (100..300).contains(&status)
}

/// An outgoing request, encoded with [`Request::encode`].
#[derive(Debug, Clone)]
pub struct Request {
    method: &'static str,
    target: String,
    headers: Vec<(&'static str, String)>,
}

impl Request {
    pub fn get(path: &str, host: &str) -> Self {
        Self {
            method: "GET",
            target: path.to_string(),
            headers: vec![
                ("Host", host.to_string()),
                ("User-Agent", concat!("gmf/", env!("CARGO_PKG_VERSION")).to_string()),
                ("Accept-Encoding", "identity".to_string()),
            ],
        }
    }

    pub fn connect(authority: &str) -> Self {
        Self {
            method: "CONNECT",
            target: authority.to_string(),
            headers: vec![("Host", authority.to_string())],
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out: String = format!("{} {} HTTP/1.1\r\n", self.method, self.target);
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.into_bytes()
    }
}

/// Writes and flushes `request`.
pub async fn send<W>(writer: &mut W, request: &Request, io_timeout: Duration) -> Result<(), HttpError>
where
    W: AsyncWrite + Unpin,
{
    let bytes: Vec<u8> = request.encode();
    timed(io_timeout, writer.write_all(&bytes)).await?;
    timed(io_timeout, writer.flush()).await
}

/// Reads a status line and header block, stopping right after the blank line.
pub async fn read_head<R>(reader: &mut R, io_timeout: Duration) -> Result<ResponseHead, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let status_line: String = read_line(reader, io_timeout).await?.ok_or(HttpError::Closed)?;
    let (version, status, reason) = parse_status_line(&status_line)?;

    let mut headers: Vec<(String, String)> = Vec::new();
    loop {
        let line: String = read_line(reader, io_timeout).await?.ok_or(HttpError::Closed)?;
        if line.is_empty() {
            break;
        }
        if headers.len() == MAX_HEADERS {
            return Err(HttpError::TooManyHeaders);
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| HttpError::BadHeader(line.clone()))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    Ok(ResponseHead {
        version,
        status,
        reason,
        headers,
    })
}

/// Reads the head of the final response, skipping interim `100 Continue` heads.
pub async fn read_final_head<R>(reader: &mut R, io_timeout: Duration) -> Result<ResponseHead, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let head: ResponseHead = read_head(reader, io_timeout).await?;
        if head.status != 100 {
            return Ok(head);
        }
    }
}

/// Reads the body that follows `head`.
pub async fn read_body<R>(
    reader: &mut R,
    head: ResponseHead,
    io_timeout: Duration,
) -> Result<Response, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let (body, complete): (Vec<u8>, bool) = match head.framing()? {
        Framing::Empty => (Vec::new(), true),
        Framing::Chunked => read_chunked(reader, io_timeout).await?,
        Framing::Length(len) => read_length(reader, len, io_timeout).await?,
        Framing::UntilClose => (read_to_close(reader, io_timeout).await?, false),
    };
    let keep_alive: bool = complete && head.can_reuse();
    Ok(Response {
        head,
        body,
        keep_alive,
    })
}

/// Reads one full response to a `GET`.
pub async fn read_response<R>(reader: &mut R, io_timeout: Duration) -> Result<Response, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let head: ResponseHead = read_final_head(reader, io_timeout).await?;
    read_body(reader, head, io_timeout).await
}

fn parse_status_line(line: &str) -> Result<(Version, u16, String), HttpError> {
    let bad = || HttpError::BadStatusLine(line.to_string());

    let mut parts = line.splitn(3, ' ');
    let version: Version = match parts.next() {
        Some("HTTP/1.1") => Version::Http11,
        Some(v) if v.starts_with("HTTP/") => Version::Http10,
        _ => return Err(bad()),
    };
    let code: &str = parts.next().ok_or_else(bad)?;
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let status: u16 = code.parse().map_err(|_| bad())?;
    if status < 100 {
        return Err(bad());
    }
    let reason: String = parts.next().unwrap_or_default().trim().to_string();

    Ok((version, status, reason))
}

async fn read_line<R>(reader: &mut R, io_timeout: Duration) -> Result<Option<String>, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::new();
    let limit: u64 = MAX_LINE as u64 + 1;
    let read: usize = timed(
        io_timeout,
        (&mut *reader).take(limit).read_until(b'\n', &mut buf),
    )
    .await?;

    if read == 0 {
        return Ok(None);
    }
    if buf.len() > MAX_LINE {
        return Err(HttpError::LineTooLong);
    }

    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Returns the body and whether it was read to its end.
async fn read_chunked<R>(reader: &mut R, io_timeout: Duration) -> Result<(Vec<u8>, bool), HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut body: Vec<u8> = Vec::new();
    loop {
        let line: String = read_line(reader, io_timeout).await?.ok_or(HttpError::Closed)?;
        let size_str: &str = line.split(';').next().unwrap_or_default().trim();
        let size: u64 =
            u64::from_str_radix(size_str, 16).map_err(|_| HttpError::BadChunk(line.clone()))?;

        if size == 0 {
            // Trailer fields, terminated by an empty line.
            while let Some(trailer) = read_line(reader, io_timeout).await? {
                if trailer.is_empty() {
                    break;
                }
            }
            return Ok((body, true));
        }

        let room: u64 = (MAX_BODY - body.len()) as u64;
        if size > room {
            body.extend(read_exact(reader, room, io_timeout).await?);
            return Ok((body, false));
        }
        body.extend(read_exact(reader, size, io_timeout).await?);
        read_line(reader, io_timeout).await?;
    }
}

async fn read_length<R>(reader: &mut R, len: u64, io_timeout: Duration) -> Result<(Vec<u8>, bool), HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let kept: u64 = len.min(MAX_BODY as u64);
    let body: Vec<u8> = read_exact(reader, kept, io_timeout).await?;
    Ok((body, kept == len))
}

async fn read_exact<R>(reader: &mut R, len: u64, io_timeout: Duration) -> Result<Vec<u8>, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut body: Vec<u8> = Vec::new();
    let mut chunk: [u8; READ_CHUNK] = [0; READ_CHUNK];
    let mut remaining: u64 = len;

    while remaining > 0 {
        let want: usize = remaining.min(READ_CHUNK as u64) as usize;
        let n: usize = timed(io_timeout, reader.read(&mut chunk[..want])).await?;
        if n == 0 {
            return Err(HttpError::Io(io::ErrorKind::UnexpectedEof.into()));
        }
        body.extend_from_slice(&chunk[..n]);
        remaining -= n as u64;
    }
    Ok(body)
}

/// Reads until the peer closes or [`MAX_BODY`] bytes have arrived.
async fn read_to_close<R>(reader: &mut R, io_timeout: Duration) -> Result<Vec<u8>, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut body: Vec<u8> = Vec::new();
    let mut chunk: [u8; READ_CHUNK] = [0; READ_CHUNK];
    loop {
        let n: usize = timed(io_timeout, reader.read(&mut chunk)).await?;
        if n == 0 {
            return Ok(body);
        }
        body.extend_from_slice(&chunk[..n]);
        if body.len() >= MAX_BODY {
            body.truncate(MAX_BODY);
            return Ok(body);
        }
    }
}

async fn timed<F, T>(io_timeout: Duration, fut: F) -> Result<T, HttpError>
where
    F: Future<Output = io::Result<T>>,
{
    match tokio::time::timeout(io_timeout, fut).await {
        Ok(result) => result.map_err(HttpError::from),
        Err(_elapsed) => Err(HttpError::Timeout(io_timeout)),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// What the stub server answers for one request.
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
    pub close: bool,
    /// Sends `body` again every [`FRAME_INTERVAL`] until the client goes away.
    pub stream: bool,
}

pub const FRAME_INTERVAL: Duration = Duration::from_millis(50);

impl Reply {
    pub fn ok(body: &[u8]) -> Self {
        Self {
            status: 200,
            body: body.to_vec(),
            close: false,
            stream: false,
        }
    }

    /// A 200 with no length whose body never ends.
    pub fn streaming(frame: &[u8]) -> Self {
        Self {
            stream: true,
            ..Self::ok(frame)
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: b"not found".to_vec(),
            close: false,
            stream: false,
        }
    }

    pub fn closing(mut self) -> Self {
        self.close = true;
        self
    }

    fn encode(&self) -> Vec<u8> {
        if self.stream {
            return format!("HTTP/1.1 {} Stub\r\n\r\n", self.status).into_bytes();
        }
        let mut out: Vec<u8> = format!(
            "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\n",
            self.status,
            self.body.len()
        )
        .into_bytes();
        if self.close {
            out.extend_from_slice(b"Connection: close\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

/// An HTTP/1.1 server on a random loopback port, answering from a handler.
pub struct StubServer {
    pub port: u16,
    requests: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
}

impl StubServer {
    /// Paths requested so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

pub async fn serve<F>(handler: F) -> anyhow::Result<StubServer>
where
    F: Fn(&str) -> Reply + Send + Sync + 'static,
{
    let listener: TcpListener = TcpListener::bind("127.0.0.1:0").await?;
    let port: u16 = listener.local_addr()?.port();
    let requests: Arc<Mutex<Vec<String>>> = Arc::default();
    let connections: Arc<AtomicUsize> = Arc::default();
    let handler = Arc::new(handler);

    let server = StubServer {
        port,
        requests: Arc::clone(&requests),
        connections: Arc::clone(&connections),
    };

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            connections.fetch_add(1, Ordering::SeqCst);
            let handler = Arc::clone(&handler);
            let requests = Arc::clone(&requests);
            tokio::spawn(async move {
                let _ = handle(stream, handler.as_ref(), &requests).await;
            });
        }
    });

    Ok(server)
}

/// Accepts connections and never answers.
pub async fn silent() -> anyhow::Result<u16> {
    let listener: TcpListener = TcpListener::bind("127.0.0.1:0").await?;
    let port: u16 = listener.local_addr()?.port();
    tokio::spawn(async move {
        let mut held: Vec<TcpStream> = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    Ok(port)
}

async fn handle<F>(stream: TcpStream, handler: &F, requests: &Mutex<Vec<String>>) -> std::io::Result<()>
where
    F: Fn(&str) -> Reply,
{
    let mut stream: BufReader<TcpStream> = BufReader::new(stream);
    loop {
        let mut request_line = String::new();
        if stream.read_line(&mut request_line).await? == 0 {
            return Ok(());
        }
        loop {
            let mut header = String::new();
            let n: usize = stream.read_line(&mut header).await?;
            if n == 0 || header == "\r\n" {
                break;
            }
        }

        let path: String = request_line
            .split_whitespace()
            .nth(1)
            .unwrap_or_default()
            .to_string();
        requests.lock().unwrap().push(path.clone());

        let reply: Reply = handler(&path);
        stream.get_mut().write_all(&reply.encode()).await?;
        if reply.stream {
            loop {
                stream.get_mut().write_all(&reply.body).await?;
                tokio::time::sleep(FRAME_INTERVAL).await;
            }
        }
        if reply.close {
            return stream.get_mut().shutdown().await;
        }
    }
}

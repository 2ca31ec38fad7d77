use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// What a test upstream answers to every request.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(&'static str),
    Json(&'static str),
    Status(u16),
    RateLimited { retry_after_secs: u64 },
}

/// A blocking HTTP/1.1 upstream on an ephemeral local port.
pub struct TestUpstream {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl TestUpstream {
    pub fn start(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind upstream");
        let addr = listener.local_addr().expect("upstream has no local addr");
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                counter.fetch_add(1, Ordering::SeqCst);
                let reply = reply.clone();
                thread::spawn(move || serve(stream, &reply));
            }
        });

        Self { addr, hits }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn id(&self) -> String {
        self.addr.to_string()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// URL of a local port with nothing listening on it.
pub fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let addr = listener.local_addr().expect("no local addr");
    drop(listener);
    format!("http://{addr}")
}

fn serve(mut stream: TcpStream, reply: &Reply) {
    // Drain the request head so the client never sees a reset.
    {
        let mut reader = BufReader::new(&stream);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) if line == "\r\n" || line == "\n" => break,
                Ok(_) => continue,
                Err(_) => return,
            }
        }
    }

    let response = match reply {
        Reply::Text(body) => response(200, "OK", "text/plain", "", body),
        Reply::Json(body) => response(200, "OK", "application/json", "", body),
        Reply::Status(code) => response(*code, "Error", "text/plain", "", "error"),
        Reply::RateLimited { retry_after_secs } => response(
            429,
            "Too Many Requests",
            "text/plain",
            &format!("Retry-After: {retry_after_secs}\r\n"),
            "slow down",
        ),
    };

    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn response(status: u16, reason: &str, content_type: &str, extra: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status} {reason}\r\n\
         Server: relayway-test\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         {extra}\r\n\
         {body}",
        body.len()
    )
}

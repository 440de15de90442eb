//! Minimal HTTP/1.1 cutout server for integration tests.
//!
//! Answers every `GET /cutout?ra=..&dec=..` with a small JPEG-like body whose
//! last line echoes the query. Requests whose `ra` is listed in `missing`
//! get 404. Every request is counted.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub struct CutoutServer {
    /// Endpoint base, e.g. "http://127.0.0.1:12345/cutout".
    pub base_url: String,
    requests: Arc<AtomicUsize>,
}

impl CutoutServer {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start() -> CutoutServer {
    start_with_missing(&[])
}

/// Like `start`, but answers 404 for any request whose `ra` matches one of `missing`.
pub fn start_with_missing(missing: &[&str]) -> CutoutServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let missing: Arc<HashSet<String>> = Arc::new(missing.iter().map(|s| s.to_string()).collect());
    let requests = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let missing = Arc::clone(&missing);
            let counter = Arc::clone(&counter);
            thread::spawn(move || handle(stream, &missing, &counter));
        }
    });
    CutoutServer {
        base_url: format!("http://127.0.0.1:{}/cutout", port),
        requests,
    }
}

fn handle(mut stream: TcpStream, missing: &HashSet<String>, counter: &AtomicUsize) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    counter.fetch_add(1, Ordering::SeqCst);

    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");
    let query = target.split_once('?').map(|(_, q)| q).unwrap_or("");
    let ra = query_param(query, "ra").unwrap_or_default();

    if missing.contains(&ra) {
        let _ = stream.write_all(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        return;
    }

    let mut body = vec![0xff, 0xd8, 0xff, 0xe0];
    body.extend_from_slice(query.as_bytes());
    body.extend_from_slice(&[0xff, 0xd9]);
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| v.to_string())
    })
}

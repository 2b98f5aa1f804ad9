//! Minimal HTTP/1.1 image host for integration tests.
//!
//! Serves fixed bodies by path. A path may carry a script of error statuses
//! that are answered (in order) before the body is served, e.g. two 429s then 200.
//! Unknown paths get 404. Every GET is counted per path.

use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Default)]
struct Routes {
    bodies: HashMap<String, Vec<u8>>,
    scripts: HashMap<String, VecDeque<u16>>,
    hits: HashMap<String, usize>,
}

/// Handle to a running server. The server runs until the process exits.
#[derive(Clone)]
pub struct GalleryServer {
    origin: String,
    routes: Arc<Mutex<Routes>>,
}

impl GalleryServer {
    /// Scheme, host and port, without trailing slash (e.g. "http://127.0.0.1:12345").
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    pub fn serve(&self, path: &str, body: Vec<u8>) {
        self.routes.lock().unwrap().bodies.insert(path.to_string(), body);
    }

    /// Answer the next requests for `path` with these statuses before serving the body.
    pub fn fail_first(&self, path: &str, statuses: &[u16]) {
        self.routes
            .lock()
            .unwrap()
            .scripts
            .insert(path.to_string(), statuses.iter().copied().collect());
    }

    pub fn hits(&self, path: &str) -> usize {
        self.routes.lock().unwrap().hits.get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.routes.lock().unwrap().hits.values().sum()
    }
}

pub fn start() -> GalleryServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes = Arc::new(Mutex::new(Routes::default()));
    let server = GalleryServer {
        origin: format!("http://127.0.0.1:{}", port),
        routes: Arc::clone(&routes),
    };
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            thread::spawn(move || handle(stream, &routes));
        }
    });
    server
}

fn handle(mut stream: std::net::TcpStream, routes: &Mutex<Routes>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("/").to_string();
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    let (status, body) = {
        let mut r = routes.lock().unwrap();
        *r.hits.entry(path.clone()).or_insert(0) += 1;
        let scripted = r.scripts.get_mut(&path).and_then(|q| q.pop_front());
        match (scripted, r.bodies.get(&path)) {
            (Some(code), _) => (code, Vec::new()),
            (None, Some(body)) => (200, body.clone()),
            (None, None) => (404, Vec::new()),
        }
    };
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Error",
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: image/jpeg\r\nConnection: close\r\n\r\n",
        status,
        reason,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body);
}

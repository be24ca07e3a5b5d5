#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use signpath_algo::MasteryMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use signpath_runtime::catalog::Catalog;
use signpath_runtime::grading::{Evaluation, GradeRequest, GradingError, GradingService};
use signpath_runtime::store::{MasteryStore, MemoryStore, StoreError};

pub const CATALOG: &str = r#"{
    "units": [{
        "id": "basics",
        "lessons": [
            {"id": "greetings", "items": [
                {"id": "Hello", "mediaPath": "hello.mp4", "correctAnswer": "Hello", "distractors": ["Goodbye"]},
                {"id": "Goodbye", "mediaPath": "goodbye.mp4", "correctAnswer": "Goodbye", "distractors": ["Hello"]}
            ]},
            {"id": "manners", "items": [
                {"id": "Thank You", "mediaPath": "thank-you.mp4", "correctAnswer": "Thank You"},
                {"id": "Please", "mediaPath": "please.mp4", "correctAnswer": "Please"}
            ]}
        ]
    }]
}"#;

pub fn catalog() -> Catalog {
    Catalog::from_json(CATALOG).unwrap()
}

// ==================== Graders ====================

/// In-process grader answering from a script keyed by word
#[derive(Default)]
pub struct ScriptedGrader {
    scores: HashMap<String, u8>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl ScriptedGrader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(mut self, word: &str, score: u8) -> Self {
        self.scores.insert(word.to_string(), score);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// (word, video length) of every call so far
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().clone()
    }
}

impl GradingService for ScriptedGrader {
    fn grade(&self, request: GradeRequest) -> BoxFuture<'_, Result<Evaluation, GradingError>> {
        self.calls
            .lock()
            .push((request.word.clone(), request.video.len()));
        let scripted = self.scores.get(&request.word).copied();
        let delay = self.delay;

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let score = scripted.ok_or(GradingError::Cancelled)?;
            Ok(Evaluation::new(score, format!("scored {score}")))
        })
    }
}

/// Grader whose every call panics
pub struct PanickingGrader;

impl GradingService for PanickingGrader {
    fn grade(&self, _request: GradeRequest) -> BoxFuture<'_, Result<Evaluation, GradingError>> {
        Box::pin(async { panic!("grading backend crashed") })
    }
}

// ==================== Stores ====================

/// Memory store whose saves can be switched to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn snapshot(&self, learner: &str) -> Option<MasteryMap> {
        self.inner.snapshot(learner)
    }
}

impl MasteryStore for FlakyStore {
    fn load<'a>(&'a self, learner: &'a str) -> BoxFuture<'a, Result<MasteryMap, StoreError>> {
        self.inner.load(learner)
    }

    fn save<'a>(
        &'a self,
        learner: &'a str,
        mastery: &'a MasteryMap,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        if self.failing.load(Ordering::SeqCst) {
            let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
            return Box::pin(async move { Err(StoreError::Io(err)) });
        }
        self.inner.save(learner, mastery)
    }
}

// ==================== HTTP ====================

/// Local HTTP server answering each connection with the next canned
/// `(status, body)`; the last one repeats
pub struct CannedServer {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedServer {
    pub async fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();

        tokio::spawn(async move {
            let mut served = 0usize;
            while let Ok((mut socket, _)) = listener.accept().await {
                let (status, body) = responses[served.min(responses.len() - 1)];
                served += 1;
                let request_line = read_request(&mut socket).await;
                log.lock().push(request_line);

                let response = format!(
                    "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    reason(status),
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self { url, requests }
    }

    /// Request lines (`POST /path?query HTTP/1.1`) received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

/// Address with nothing listening on it
pub async fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    url
}

/// Read one full request and return its request line
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::new(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("content-length")
            .then(|| value.trim().parse::<usize>().ok())
            .flatten()
    });

    loop {
        let complete = match content_length {
            Some(len) => buf.len() >= header_end + len,
            None => buf.ends_with(b"0\r\n\r\n"),
        };
        if complete {
            break;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    head.lines().next().unwrap_or_default().to_string()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

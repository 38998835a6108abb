//! Shared test infrastructure for integration tests.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const FEED_PREFIX: &str = "/api/mods/";

/// Canned response for one mod name.
#[derive(Clone)]
pub enum FeedReply {
    /// `(version, factorio_version)` pairs.
    Releases(Vec<(&'static str, &'static str)>),
    Status(u16),
    /// Hold the connection open without answering for the given time.
    Stall(Duration),
}

/// Minimal HTTP server standing in for the mod portal.
///
/// Names without a canned reply get a 404, which the pinner treats as an
/// unknown mod.
pub struct FeedServer {
    pub base_url: String,
}

impl FeedServer {
    pub fn start(replies: BTreeMap<&'static str, FeedReply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind feed server");
        let addr = listener.local_addr().expect("feed server address");
        let replies = Arc::new(replies);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else {
                    continue;
                };
                let replies = Arc::clone(&replies);
                thread::spawn(move || serve(stream, &replies));
            }
        });
        Self {
            base_url: format!("http://{addr}{}", FEED_PREFIX.trim_end_matches('/')),
        }
    }
}

fn serve(mut stream: TcpStream, replies: &BTreeMap<&'static str, FeedReply>) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 || header == "\r\n" || header == "\n" {
            break;
        }
    }

    let path = request_line.split_whitespace().nth(1).unwrap_or_default();
    let name = path.strip_prefix(FEED_PREFIX).unwrap_or_default();
    let (status, body) = match replies.get(name) {
        Some(FeedReply::Releases(releases)) => (200, portal_body(name, releases)),
        Some(FeedReply::Status(status)) => (*status, "{\"message\":\"error\"}".to_string()),
        Some(FeedReply::Stall(duration)) => {
            thread::sleep(*duration);
            return Ok(());
        }
        None => (404, "{\"message\":\"Mod not found\"}".to_string()),
    };
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    write!(
        stream,
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )?;
    stream.flush()
}

fn portal_body(name: &str, releases: &[(&str, &str)]) -> String {
    let releases = releases
        .iter()
        .map(|(version, platform)| {
            serde_json::json!({
                "version": version,
                "info_json": { "factorio_version": platform },
            })
        })
        .collect::<Vec<_>>();
    serde_json::json!({ "name": name, "releases": releases }).to_string()
}

/// A pack directory with an `info.json` and an isolated config file.
pub struct PackFixture {
    _temp_dir: TempDir,
    pub pack_dir: PathBuf,
    pub config_path: PathBuf,
}

impl PackFixture {
    pub fn new(info_json: &str) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let pack_dir = temp_dir.path().join("qol-2-plus");
        std::fs::create_dir_all(&pack_dir).expect("create pack dir");
        std::fs::write(pack_dir.join("info.json"), info_json).expect("write info.json");
        let config_path = temp_dir.path().join("modpin.json");
        std::fs::write(&config_path, "{\"schema_version\": 1}").expect("write config");
        Self {
            _temp_dir: temp_dir,
            pack_dir,
            config_path,
        }
    }

    pub fn info_path(&self) -> PathBuf {
        self.pack_dir.join("info.json")
    }

    pub fn read_info(&self) -> String {
        std::fs::read_to_string(self.info_path()).expect("read info.json")
    }

    /// Run the pinner against this pack with the given extra arguments.
    pub fn run(&self, feed: &FeedServer, extra: &[&str]) -> Output {
        run_modpin(&self.pack_dir, &self.config_path, &feed.base_url, extra)
    }

    /// Like [`PackFixture::run`] with a specific feed timeout.
    pub fn run_with_timeout(&self, feed: &FeedServer, timeout_secs: u64, extra: &[&str]) -> Output {
        run_modpin_with_timeout(
            &self.pack_dir,
            &self.config_path,
            &feed.base_url,
            timeout_secs,
            extra,
        )
    }
}

pub fn run_modpin(path: &Path, config: &Path, feed_url: &str, extra: &[&str]) -> Output {
    run_modpin_with_timeout(path, config, feed_url, 5, extra)
}

pub fn run_modpin_with_timeout(
    path: &Path,
    config: &Path,
    feed_url: &str,
    timeout_secs: u64,
    extra: &[&str],
) -> Output {
    Command::new(env!("CARGO_BIN_EXE_modpin"))
        .arg(path)
        .arg("--config")
        .arg(config)
        .arg("--feed-url")
        .arg(feed_url)
        .arg("--timeout-secs")
        .arg(timeout_secs.to_string())
        .args(extra)
        .env_remove("MODPIN_LOG")
        .env_remove("MODPIN_FEED_URL")
        .env_remove("MODPIN_TIMEOUT_SECS")
        .env_remove("HTTP_PROXY")
        .env_remove("http_proxy")
        .env_remove("HTTPS_PROXY")
        .env_remove("https_proxy")
        .env_remove("ALL_PROXY")
        .env_remove("all_proxy")
        .output()
        .expect("run modpin")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

//! Shared harness for the end-to-end tests: starts a server on a loopback
//! port with the local filesystem backend and drives it over raw TCP.

use bucketftp::storage::Filesystem;
use bucketftp::Server;

use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Spawns a server rooted at `root` listening on `addr` and waits for it to
/// come up.
pub async fn spawn_server(addr: &'static str, root: PathBuf) {
    let server = Server::new(Box::new(move |_grant| Filesystem::new(root.clone())))
        .greeting("Welcome test")
        .passive_ports(50000..=65534)
        .anonymous(true);
    tokio::spawn(async move {
        server.listen(addr).await.unwrap();
    });
    // Poll until the listener answers.
    for _ in 0..50 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("server on {} did not come up", addr);
}

/// A minimal FTP control connection for tests.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    /// Connects and consumes the greeting, which it returns.
    pub async fn connect(addr: &str) -> TestClient {
        let stream = TcpStream::connect(addr).await.expect("connect control");
        let (rd, wr) = stream.into_split();
        let mut client = TestClient {
            reader: BufReader::new(rd),
            writer: wr,
        };
        let greeting = client.read_reply().await;
        assert!(greeting.starts_with("220"), "expected 220 greeting, got {:?}", greeting);
        client
    }

    /// Sends one command line.
    pub async fn send(&mut self, line: &str) {
        self.writer.write_all(format!("{}\r\n", line).as_bytes()).await.expect("write command");
    }

    /// Reads one full reply, multi line continuations included. The returned
    /// string has inner CRLFs preserved and the final CRLF trimmed.
    pub async fn read_reply(&mut self) -> String {
        let mut first = String::new();
        let n = self.reader.read_line(&mut first).await.expect("read reply");
        assert!(n > 0, "control connection closed while waiting for a reply");
        let mut full = first.clone();
        if first.len() >= 4 && &first[3..4] == "-" {
            let code = &first[..3].to_string();
            loop {
                let mut line = String::new();
                let n = self.reader.read_line(&mut line).await.expect("read continuation");
                assert!(n > 0, "control connection closed mid reply");
                full.push_str(&line);
                if line.starts_with(code.as_str()) && line.len() >= 4 && &line[3..4] == " " {
                    break;
                }
            }
        }
        full.trim_end().to_string()
    }

    /// Sends a command and returns its reply.
    pub async fn cmd(&mut self, line: &str) -> String {
        self.send(line).await;
        self.read_reply().await
    }

    /// Sends a command and asserts the reply starts with `expect`.
    pub async fn expect(&mut self, line: &str, expect: &str) -> String {
        let reply = self.cmd(line).await;
        assert!(
            reply.starts_with(expect),
            "command {:?}: expected reply starting with {:?}, got {:?}",
            line,
            expect,
            reply
        );
        reply
    }

    /// Logs in as anonymous.
    pub async fn login(&mut self) {
        self.expect("USER anonymous", "331").await;
        self.expect("PASS x@y", "230").await;
    }

    /// Issues PASV and connects to the advertised endpoint.
    pub async fn pasv(&mut self) -> TcpStream {
        let reply = self.expect("PASV", "227").await;
        let addr = parse_pasv_reply(&reply);
        TcpStream::connect(addr).await.expect("connect data")
    }

    /// Tells whether the server closed the control connection.
    pub async fn assert_closed(&mut self) {
        let mut buf = [0u8; 1];
        match tokio::time::timeout(Duration::from_secs(5), self.reader.read(&mut buf)).await {
            Ok(Ok(0)) => {}
            other => panic!("expected the control connection to close, got {:?}", other),
        }
    }
}

/// Extracts `host:port` from a `227 ... (h1,h2,h3,h4,p1,p2)` reply.
pub fn parse_pasv_reply(reply: &str) -> String {
    let open = reply.find('(').expect("no ( in PASV reply");
    let close = reply.find(')').expect("no ) in PASV reply");
    let nums: Vec<u16> = reply[open + 1..close].split(',').map(|n| n.parse().expect("PASV byte")).collect();
    assert_eq!(nums.len(), 6, "PASV reply must carry six numbers: {}", reply);
    format!("{}.{}.{}.{}:{}", nums[0], nums[1], nums[2], nums[3], nums[4] * 256 + nums[5])
}

/// Reads a data connection to EOF and returns the bytes.
pub async fn read_to_end(mut stream: TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.expect("read data connection");
    out
}

//! End-to-end protocol tests over real TCP sockets.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::time::timeout;

use rax_vault_server::auth::CredentialStore;
use rax_vault_server::config::ServerConfig;
use rax_vault_server::protocol::messages;
use rax_vault_server::server::ShutdownHandle;
use rax_vault_server::transfer::framing::{self, CHUNK_SIZE, Frame, PREVIEW_SIZE};
use rax_vault_server::Server;

struct TestServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    root: tempfile::TempDir,
}

async fn start_server() -> TestServer {
    start_server_with_sessions(4).await
}

async fn start_server_with_sessions(max_sessions: usize) -> TestServer {
    let root = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        bind_address: "127.0.0.1".to_string(),
        port: 0,
        max_sessions,
        storage_root: root.path().to_string_lossy().into_owned(),
        credentials_file: "unused".to_string(),
    };
    let credentials = CredentialStore::from_pairs([("alice", "secret"), ("bob", "hunter2")]);

    let server = Server::bind(config, credentials).await.unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();
    tokio::spawn(server.run());

    TestServer {
        addr,
        shutdown,
        root,
    }
}

struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    /// Connects and completes the challenge round-trip, asserting success.
    async fn connect_authenticated(addr: SocketAddr, username: &str, password: &str) -> Self {
        let mut client = Self::connect(addr).await;
        assert_eq!(
            client.authenticate(username, password).await,
            messages::AUTH_SUCCESS
        );
        client
    }

    async fn read_line(&mut self) -> Option<String> {
        framing::read_trimmed_line(&mut self.reader).await.unwrap()
    }

    async fn send_line(&mut self, line: &str) {
        framing::write_line(&mut self.writer, line).await.unwrap();
    }

    /// Asserts the server dropped the connection. A reset counts the same
    /// as an orderly close: the server may still hold unread bytes when it
    /// abandons a violating peer.
    async fn expect_closed(&mut self) {
        let mut buf = [0u8; 1];
        match self.reader.read(&mut buf).await {
            Ok(0) | Err(_) => {}
            Ok(_) => panic!("connection still open"),
        }
    }

    async fn authenticate(&mut self, username: &str, password: &str) -> String {
        assert_eq!(
            self.read_line().await.as_deref(),
            Some(messages::AUTH_CHALLENGE)
        );
        self.send_line(&format!("{username}:{password}")).await;
        self.read_line().await.unwrap()
    }

    /// Collects a framed response: `Some(bytes)` up to the end-marker, or
    /// `None` for the not-found marker.
    async fn read_stream(&mut self) -> Option<Vec<u8>> {
        let mut data = Vec::new();
        loop {
            match framing::read_frame(&mut self.reader).await.unwrap() {
                Frame::Chunk(chunk) => data.extend_from_slice(&chunk),
                Frame::End => return Some(data),
                Frame::NotFound => return None,
            }
        }
    }

    /// Runs the full upload dialogue. Returns the final response and the
    /// number of per-chunk acknowledgments received.
    async fn upload(&mut self, name: &str, content: &[u8]) -> (String, usize) {
        self.send_line("UPLOAD").await;
        assert_eq!(
            self.read_line().await.as_deref(),
            Some(messages::UPLOAD_READY)
        );
        self.send_line(&format!("FILENAME:{name}")).await;
        assert_eq!(
            self.read_line().await.as_deref(),
            Some(messages::RECEIVING_CHUNKS)
        );

        let mut acks = 0;
        for chunk in content.chunks(CHUNK_SIZE) {
            framing::write_chunk(&mut self.writer, chunk).await.unwrap();
            assert_eq!(
                self.read_line().await.as_deref(),
                Some(messages::CHUNK_RECEIVED)
            );
            acks += 1;
        }
        framing::write_end_marker(&mut self.writer).await.unwrap();

        (self.read_line().await.unwrap(), acks)
    }

    async fn download(&mut self, name: &str) -> Option<Vec<u8>> {
        self.send_line("DOWNLOAD").await;
        assert_eq!(
            self.read_line().await.as_deref(),
            Some(messages::DOWNLOAD_PROMPT)
        );
        self.send_line(name).await;
        match self.read_line().await.as_deref() {
            Some(m) if m == messages::FILE_EXISTS => self.read_stream().await,
            Some(m) => {
                assert_eq!(m, messages::DOWNLOAD_FAILED);
                None
            }
            None => None,
        }
    }

    async fn preview(&mut self, name: &str) -> Option<Vec<u8>> {
        self.send_line("PREVIEW").await;
        assert_eq!(
            self.read_line().await.as_deref(),
            Some(messages::PREVIEW_PROMPT)
        );
        self.send_line(name).await;
        self.read_stream().await
    }

    async fn delete(&mut self, name: &str) -> String {
        self.send_line("DELETE").await;
        assert_eq!(
            self.read_line().await.as_deref(),
            Some(messages::DELETE_PROMPT)
        );
        self.send_line(name).await;
        self.read_line().await.unwrap()
    }

    async fn list(&mut self) -> String {
        self.send_line("LIST").await;
        String::from_utf8(self.read_stream().await.unwrap()).unwrap()
    }
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_valid_credentials_authenticate() {
    let server = start_server().await;
    let _client = TestClient::connect_authenticated(server.addr, "alice", "secret").await;
}

#[tokio::test]
async fn test_invalid_credentials_close_connection_without_retry() {
    let server = start_server().await;
    let mut client = TestClient::connect(server.addr).await;
    assert_eq!(
        client.authenticate("alice", "wrong").await,
        messages::AUTH_FAILED
    );
    // No second prompt: the connection is closed.
    assert_eq!(client.read_line().await, None);
}

#[tokio::test]
async fn test_malformed_credentials_close_connection() {
    let server = start_server().await;
    let mut client = TestClient::connect(server.addr).await;
    assert_eq!(
        client.read_line().await.as_deref(),
        Some(messages::AUTH_CHALLENGE)
    );
    client.send_line("no-colon-here").await;
    assert_eq!(client.read_line().await.as_deref(), Some(messages::AUTH_FAILED));
    assert_eq!(client.read_line().await, None);
}

#[tokio::test]
async fn test_oversized_credential_line_closes_connection() {
    let server = start_server().await;
    let mut client = TestClient::connect(server.addr).await;
    assert_eq!(
        client.read_line().await.as_deref(),
        Some(messages::AUTH_CHALLENGE)
    );

    let mut line = vec![b'a'; 4096];
    line.push(b'\n');
    client.writer.write_all(&line).await.unwrap();
    client.expect_closed().await;
}

#[tokio::test]
async fn test_oversized_command_line_closes_session() {
    let server = start_server().await;
    let mut client = TestClient::connect_authenticated(server.addr, "alice", "secret").await;

    // A line this long can never be a command; its tail cannot be
    // resynchronized, so the server drops the connection.
    let mut line = vec![b'x'; 4096];
    line.push(b'\n');
    client.writer.write_all(&line).await.unwrap();
    client.expect_closed().await;
}

#[tokio::test]
async fn test_upload_list_download_scenario() {
    let server = start_server().await;
    let mut client = TestClient::connect_authenticated(server.addr, "alice", "secret").await;

    // 10000 bytes travel as 4096 + 4096 + 1808, one ack each.
    let content = pattern(10000);
    let (response, acks) = client.upload("report.bin", &content).await;
    assert_eq!(response, "UPLOAD SUCCESSFUL: report.bin");
    assert_eq!(acks, 3);

    assert_eq!(client.list().await, "FILES:\nreport.bin");

    let downloaded = client.download("report.bin").await.unwrap();
    assert_eq!(downloaded, content);
}

#[tokio::test]
async fn test_upload_empty_file() {
    let server = start_server().await;
    let mut client = TestClient::connect_authenticated(server.addr, "alice", "secret").await;

    let (response, acks) = client.upload("empty.bin", b"").await;
    assert_eq!(response, "UPLOAD SUCCESSFUL: empty.bin");
    assert_eq!(acks, 0);
    assert_eq!(client.download("empty.bin").await.unwrap(), Vec::<u8>::new());
}

#[tokio::test]
async fn test_preview_returns_leading_bytes() {
    let server = start_server().await;
    let mut client = TestClient::connect_authenticated(server.addr, "alice", "secret").await;

    let content = pattern(3000);
    client.upload("big.bin", &content).await;
    assert_eq!(
        client.preview("big.bin").await.unwrap(),
        &content[..PREVIEW_SIZE]
    );

    client.upload("small.txt", b"ten bytes.").await;
    assert_eq!(client.preview("small.txt").await.unwrap(), b"ten bytes.");
}

#[tokio::test]
async fn test_preview_missing_file_sends_not_found_marker() {
    let server = start_server().await;
    let mut client = TestClient::connect_authenticated(server.addr, "alice", "secret").await;
    assert_eq!(client.preview("ghost.txt").await, None);
}

#[tokio::test]
async fn test_path_traversal_is_reduced_to_basename() {
    let server = start_server().await;
    let mut client = TestClient::connect_authenticated(server.addr, "alice", "secret").await;

    let (response, _) = client.upload("../intruder/evil.txt", b"trapped").await;
    assert_eq!(response, "UPLOAD SUCCESSFUL: evil.txt");

    // The file landed inside alice's sandbox, nowhere else.
    assert!(server.root.path().join("alice").join("evil.txt").is_file());
    assert!(!server.root.path().join("intruder").exists());

    // Download and delete apply the same reduction.
    assert_eq!(
        client.download("nested/dir/evil.txt").await.unwrap(),
        b"trapped"
    );
    assert_eq!(
        client.delete("../alice/evil.txt").await,
        "FILE 'evil.txt' DELETED SUCCESSFULLY."
    );
    assert_eq!(client.list().await, "NO FILES FOUND");
}

#[tokio::test]
async fn test_list_empty_sandbox_is_idempotent() {
    let server = start_server().await;
    let mut client = TestClient::connect_authenticated(server.addr, "alice", "secret").await;
    assert_eq!(client.list().await, "NO FILES FOUND");
    assert_eq!(client.list().await, "NO FILES FOUND");
}

#[tokio::test]
async fn test_delete_missing_file_leaves_sandbox_unchanged() {
    let server = start_server().await;
    let mut client = TestClient::connect_authenticated(server.addr, "alice", "secret").await;

    client.upload("keep.txt", b"keep me").await;
    assert_eq!(client.delete("ghost.txt").await, messages::DELETE_FAILED);
    assert_eq!(client.list().await, "FILES:\nkeep.txt");
}

#[tokio::test]
async fn test_invalid_command_keeps_session_open() {
    let server = start_server().await;
    let mut client = TestClient::connect_authenticated(server.addr, "alice", "secret").await;

    client.send_line("MAKE COFFEE").await;
    assert_eq!(
        client.read_line().await.as_deref(),
        Some(messages::INVALID_COMMAND)
    );

    // Commands are case-insensitive and the session is still usable.
    client.send_line("list").await;
    assert_eq!(
        client.read_stream().await.unwrap(),
        b"NO FILES FOUND"
    );
}

#[tokio::test]
async fn test_sandboxes_are_isolated_per_user() {
    let server = start_server().await;
    let mut alice = TestClient::connect_authenticated(server.addr, "alice", "secret").await;
    let mut bob = TestClient::connect_authenticated(server.addr, "bob", "hunter2").await;

    alice.upload("private.txt", b"for alice only").await;

    assert_eq!(bob.list().await, "NO FILES FOUND");
    assert_eq!(bob.download("private.txt").await, None);
    assert_eq!(bob.download("../alice/private.txt").await, None);
}

#[tokio::test]
async fn test_shutdown_notifies_all_live_sessions() {
    let server = start_server().await;
    let mut alice = TestClient::connect_authenticated(server.addr, "alice", "secret").await;
    let mut bob = TestClient::connect_authenticated(server.addr, "bob", "hunter2").await;

    server.shutdown.shutdown();

    let notice = timeout(Duration::from_secs(5), alice.read_line())
        .await
        .unwrap();
    assert_eq!(notice.as_deref(), Some(messages::SERVER_SHUTDOWN));
    let notice = timeout(Duration::from_secs(5), bob.read_line())
        .await
        .unwrap();
    assert_eq!(notice.as_deref(), Some(messages::SERVER_SHUTDOWN));
}

#[tokio::test]
async fn test_shutdown_closes_connection_awaiting_credentials() {
    let server = start_server().await;
    let mut client = TestClient::connect(server.addr).await;
    assert_eq!(
        client.read_line().await.as_deref(),
        Some(messages::AUTH_CHALLENGE)
    );

    // Unauthenticated sessions get no notice line, but they must still be
    // torn down so their worker permits are released.
    server.shutdown.shutdown();
    let read = timeout(Duration::from_secs(5), client.read_line())
        .await
        .unwrap();
    assert_eq!(read, None);
}

#[tokio::test]
async fn test_excess_connections_queue_for_a_free_worker() {
    let server = start_server_with_sessions(1).await;
    let first = TestClient::connect_authenticated(server.addr, "alice", "secret").await;

    // The pool is exhausted: the second connection is accepted but not
    // served yet.
    let mut second = TestClient::connect(server.addr).await;
    assert!(
        timeout(Duration::from_millis(200), second.read_line())
            .await
            .is_err()
    );

    // Freeing the worker lets the queued connection proceed.
    drop(first);
    let challenge = timeout(Duration::from_secs(5), second.read_line())
        .await
        .unwrap();
    assert_eq!(challenge.as_deref(), Some(messages::AUTH_CHALLENGE));
}

//! End-to-end tests: a real server on a loopback port, driven over raw TCP
//! with the local filesystem backend standing in for the object store.

mod common;

use common::{read_to_end, spawn_server, TestClient};

use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn anonymous_login_and_pwd() {
    let root = tempfile::tempdir().unwrap();
    spawn_server("127.0.0.1:2121", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2121").await;
    client.expect("USER anonymous", "331").await;
    client.expect("PASS x@y", "230").await;
    let reply = client.expect("PWD", "257").await;
    assert!(reply.contains("\"/\""), "PWD should quote the root: {}", reply);
    client.expect("QUIT", "221").await;
    client.assert_closed().await;
}

#[tokio::test]
async fn passive_directory_listing() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("readme.txt"), b"0123456789").unwrap();
    std::fs::create_dir(root.path().join("sub")).unwrap();
    spawn_server("127.0.0.1:2122", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2122").await;
    client.login().await;
    client.expect("TYPE I", "200").await;
    let data = client.pasv().await;
    let reply = client.expect("LIST", "150").await;
    assert!(reply.contains("returning 2 file(s)"), "LIST 150 should carry the count: {}", reply);

    let listing = String::from_utf8(read_to_end(data).await).unwrap();
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("readme.txt"), "sorted ascending: {:?}", lines);
    assert!(lines[1].ends_with("sub"), "sorted ascending: {:?}", lines);

    let reply = client.read_reply().await;
    assert!(reply.starts_with("226"), "expected 226 after the listing, got {}", reply);
    client.expect("QUIT", "221").await;
}

#[tokio::test]
async fn stor_with_rest_offset() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("big.bin"), vec![0u8; 1024]).unwrap();
    spawn_server("127.0.0.1:2123", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2123").await;
    client.login().await;
    client.expect("TYPE I", "200").await;
    let mut data = client.pasv().await;
    client.expect("REST 1024", "350 Restarting next transfer at 1024").await;
    client.expect("STOR big.bin", "150").await;

    data.write_all(&vec![7u8; 2048]).await.unwrap();
    data.shutdown().await.unwrap();
    drop(data);

    let reply = client.read_reply().await;
    assert!(reply.starts_with("226"), "expected 226 after STOR, got {}", reply);
    assert!(reply.contains("/big.bin"), "226 should name the stored path: {}", reply);

    let stored = std::fs::read(root.path().join("big.bin")).unwrap();
    assert_eq!(stored.len(), 3072);
    assert!(stored[1024..].iter().all(|b| *b == 7));

    // The REST offset applies to exactly one transfer.
    client.expect("QUIT", "221").await;
}

#[tokio::test]
async fn rename_moves_a_file() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("a.txt"), b"payload").unwrap();
    spawn_server("127.0.0.1:2124", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2124").await;
    client.login().await;
    client.expect("RNFR a.txt", "350").await;
    client.expect("RNTO b.txt", "250").await;
    client.expect("QUIT", "221").await;

    assert!(!root.path().join("a.txt").exists());
    assert_eq!(std::fs::read(root.path().join("b.txt")).unwrap(), b"payload");
}

#[tokio::test]
async fn rnto_without_rnfr_is_a_sequence_error() {
    let root = tempfile::tempdir().unwrap();
    spawn_server("127.0.0.1:2125", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2125").await;
    client.login().await;
    client.expect("RNTO b.txt", "503").await;
}

#[tokio::test]
async fn abor_mid_retr_keeps_the_control_connection() {
    let root = tempfile::tempdir().unwrap();
    // Big enough that the transfer is still in flight when the ABOR lands.
    std::fs::write(root.path().join("huge.bin"), vec![1u8; 16 * 1024 * 1024]).unwrap();
    spawn_server("127.0.0.1:2126", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2126").await;
    client.login().await;
    let data = client.pasv().await;
    client.expect("RETR huge.bin", "150").await;

    // Do not read the data connection; back pressure stalls the transfer.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let reply = client.expect("ABOR", "226").await;
    assert!(reply.contains("aborted"), "ABOR 226 should mention the abort: {}", reply);
    drop(data);

    // The session survives the abort.
    client.expect("NOOP", "200").await;
    client.expect("QUIT", "221").await;
}

#[tokio::test]
async fn unknown_directive_is_rejected_but_session_continues() {
    let root = tempfile::tempdir().unwrap();
    spawn_server("127.0.0.1:2127", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2127").await;
    client.login().await;
    let reply = client.expect("FROB", "502").await;
    assert!(reply.contains("Command not allowed: FROB"), "got {}", reply);
    client.expect("NOOP", "200").await;
}

#[tokio::test]
async fn commands_require_login() {
    let root = tempfile::tempdir().unwrap();
    spawn_server("127.0.0.1:2128", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2128").await;
    client.expect("PWD", "530").await;
    client.expect("LIST", "530").await;
    // FEAT and NOOP work before login.
    client.expect("NOOP", "200").await;
    let feat = client.expect("FEAT", "211").await;
    assert!(feat.contains(" SIZE"), "FEAT advertises SIZE: {}", feat);
    assert!(feat.contains(" MDTM"), "FEAT advertises MDTM: {}", feat);
    assert!(feat.contains(" UTF8"), "FEAT advertises UTF8: {}", feat);
    assert!(feat.contains(" REST STREAM"), "FEAT advertises REST STREAM: {}", feat);
    assert!(feat.contains(" ANON"), "FEAT advertises ANON: {}", feat);
}

#[tokio::test]
async fn mkd_size_mdtm_and_dele() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("data.bin"), vec![9u8; 42]).unwrap();
    spawn_server("127.0.0.1:2129", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2129").await;
    client.login().await;

    let reply = client.expect("MKD books", "257").await;
    assert!(reply.contains("\"/books\""), "MKD quotes the new path: {}", reply);
    assert!(root.path().join("books").is_dir());

    client.expect("SIZE data.bin", "213 42").await;

    let mdtm = client.expect("MDTM data.bin", "213").await;
    // 213 YYYYMMDDHHMMSS.sss
    let stamp = mdtm.split_whitespace().nth(1).unwrap();
    assert_eq!(stamp.len(), 18, "MDTM format: {}", mdtm);
    assert!(stamp[..14].chars().all(|c| c.is_ascii_digit()));
    assert_eq!(&stamp[14..15], ".");

    client.expect("DELE data.bin", "250").await;
    assert!(!root.path().join("data.bin").exists());

    client.expect("CWD books", "250").await;
    client.expect("PWD", "257 \"/books\"").await;
    client.expect("CDUP", "250").await;
    client.expect("PWD", "257 \"/\"").await;
}

#[tokio::test]
async fn retr_of_a_directory_is_refused() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("sub")).unwrap();
    spawn_server("127.0.0.1:2130", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2130").await;
    client.login().await;
    let _data = client.pasv().await;
    client.expect("RETR sub", "550 Cannot retrieve a directory").await;
}

#[tokio::test]
async fn retr_streams_the_file_back() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("hello.txt"), b"hello over ftp").unwrap();
    spawn_server("127.0.0.1:2131", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2131").await;
    client.login().await;
    let data = client.pasv().await;
    client.expect("RETR hello.txt", "150").await;
    let body = read_to_end(data).await;
    assert_eq!(body, b"hello over ftp");
    let reply = client.read_reply().await;
    assert!(reply.starts_with("226"), "expected 226 after RETR, got {}", reply);
}

#[tokio::test]
async fn retr_honours_rest_offset() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("hello.txt"), b"0123456789").unwrap();
    spawn_server("127.0.0.1:2132", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2132").await;
    client.login().await;
    let data = client.pasv().await;
    client.expect("REST 4", "350").await;
    client.expect("RETR hello.txt", "150").await;
    assert_eq!(read_to_end(data).await, b"456789");
    let reply = client.read_reply().await;
    assert!(reply.starts_with("226"));

    // A second RETR starts from zero again.
    let data = client.pasv().await;
    client.expect("RETR hello.txt", "150").await;
    assert_eq!(read_to_end(data).await, b"0123456789");
    let reply = client.read_reply().await;
    assert!(reply.starts_with("226"));
}

#[tokio::test]
async fn transfer_without_connector_gets_425() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("a.txt"), b"x").unwrap();
    spawn_server("127.0.0.1:2133", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2133").await;
    client.login().await;
    client.expect("RETR a.txt", "425").await;
    client.expect("STOR b.txt", "425").await;
    client.expect("LIST", "425").await;
}

#[tokio::test]
async fn nlst_returns_bare_names() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("one.txt"), b"1").unwrap();
    std::fs::write(root.path().join("two.txt"), b"2").unwrap();
    spawn_server("127.0.0.1:2134", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2134").await;
    client.login().await;
    let data = client.pasv().await;
    client.expect("NLST", "150").await;
    let listing = String::from_utf8(read_to_end(data).await).unwrap();
    assert_eq!(listing, "one.txt\r\ntwo.txt\r\n");
    let reply = client.read_reply().await;
    assert!(reply.starts_with("226"));
}

#[tokio::test]
async fn mlsd_lists_machine_readable_facts() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("f.txt"), b"abc").unwrap();
    spawn_server("127.0.0.1:2135", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2135").await;
    client.login().await;
    let data = client.pasv().await;
    client.expect("MLSD", "150").await;
    let listing = String::from_utf8(read_to_end(data).await).unwrap();
    assert!(listing.contains("Type=file;"), "{}", listing);
    assert!(listing.contains("Size=3;"), "{}", listing);
    assert!(listing.ends_with(" f.txt\r\n"), "{}", listing);
    let reply = client.read_reply().await;
    assert!(reply.starts_with("226"));
}

#[tokio::test]
async fn mlst_replies_on_the_control_channel() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("f.txt"), b"abc").unwrap();
    spawn_server("127.0.0.1:2136", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2136").await;
    client.login().await;
    let reply = client.expect("MLST f.txt", "250").await;
    assert!(reply.contains("Type=file;"), "{}", reply);
    assert!(reply.contains("Size=3;"), "{}", reply);
}

#[tokio::test]
async fn opts_and_site_commands() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("f.txt"), b"abc").unwrap();
    spawn_server("127.0.0.1:2137", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2137").await;
    client.login().await;
    client.expect("OPTS UTF8 ON", "200").await;
    let reply = client.expect("OPTS MLST Type;Size", "200").await;
    assert!(reply.contains("Type;"), "{}", reply);
    assert!(reply.contains("Size;"), "{}", reply);
    client.expect("SITE CHMOD 644 f.txt", "200").await;
    client.expect("SITE IDLE 60", "504").await;
    client.expect("SYST", "215 UNIX Type: L8").await;
    client.expect("MODE S", "200").await;
    client.expect("MODE B", "504").await;
    client.expect("STRU F", "200").await;
    client.expect("STRU P", "504").await;
    client.expect("ALLO", "202").await;
    client.expect("HELP", "211").await;
    client.expect("HELP RETR", "214").await;
}

#[tokio::test]
async fn stou_stores_under_a_unique_name() {
    let root = tempfile::tempdir().unwrap();
    spawn_server("127.0.0.1:2138", root.path().to_path_buf()).await;

    let mut client = TestClient::connect("127.0.0.1:2138").await;
    client.login().await;
    let mut data = client.pasv().await;
    let reply = client.expect("STOU report.pdf", "150").await;
    let name = reply.split("FILE: ").nth(1).expect("STOU names the file").to_string();
    assert!(name.starts_with("report_"), "{}", name);
    assert!(name.ends_with(".pdf"), "{}", name);

    data.write_all(b"pdf bytes").await.unwrap();
    data.shutdown().await.unwrap();
    drop(data);

    let reply = client.read_reply().await;
    assert!(reply.starts_with("226"), "{}", reply);
    assert_eq!(std::fs::read(root.path().join(&name)).unwrap(), b"pdf bytes");
}

#[tokio::test]
async fn blacklisted_directives_are_refused() {
    let root = tempfile::tempdir().unwrap();
    let root_path = root.path().to_path_buf();
    let server = bucketftp::Server::new(Box::new(move |_grant| bucketftp::storage::Filesystem::new(root_path.clone())))
        .passive_ports(50000..=65534)
        .blacklist(vec!["DELE"]);
    tokio::spawn(async move {
        server.listen("127.0.0.1:2139").await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(300)).await;

    let mut client = TestClient::connect("127.0.0.1:2139").await;
    client.login().await;
    client.expect("DELE something", "502 Command not allowed: DELE").await;
}

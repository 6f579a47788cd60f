//! Listener end to end over TCP with a real SQLite file

mod common;

use pretty_assertions::assert_eq;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use common::*;
use vortex::Opts;
use vortex::backend::SqliteBackend;
use vortex::error::Result;
use vortex::protocol::response::read_err;
use vortex::tokio::Server;

struct Running {
    addr: std::net::SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<()>>,
    _dir: tempfile::TempDir,
}

async fn start(password: Option<&str>) -> Running {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = Opts {
        identity: (*identity(password)).clone(),
        data_file: dir.path().join("vortex.db"),
        ..Opts::default()
    };
    opts.identity.port = 0;

    let backend = SqliteBackend::new(opts.data_file.clone());
    let server = Server::bind(opts, backend).await.unwrap();
    let addr = server.local_addr().unwrap();

    let (shutdown, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(server.run_until(async {
        let _ = rx.await;
    }));

    Running {
        addr,
        shutdown,
        task,
        _dir: dir,
    }
}

async fn connect(addr: std::net::SocketAddr) -> TestClient<TcpStream> {
    TestClient::new(TcpStream::connect(addr).await.unwrap())
}

#[tokio::test]
async fn create_insert_select_over_tcp() {
    let server = start(None).await;
    let mut client = connect(server.addr).await;
    client.login(None).await;

    client
        .query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, score REAL)")
        .await;
    assert_eq!(client.expect().await, (1, OK.to_vec()));

    client
        .query("INSERT INTO users VALUES (1, 'alice', 9.5), (2, 'bob', NULL)")
        .await;
    assert_eq!(client.expect().await, (1, OK.to_vec()));

    client.query("SELECT id, name, score FROM users ORDER BY id").await;
    let result = client.read_result_set(1).await;
    assert_eq!(result.columns, vec!["id", "name", "score"]);
    assert_eq!(
        result.rows,
        vec![vec!["1", "alice", "9.5"], vec!["2", "bob", "NULL"]]
    );

    server.shutdown.send(()).unwrap();
    assert!(server.task.await.unwrap().is_ok());
}

#[tokio::test]
async fn writes_are_visible_to_other_sessions() {
    let server = start(Some("pw")).await;

    let mut writer = connect(server.addr).await;
    writer.login(Some("pw")).await;
    writer.query("CREATE TABLE t (v TEXT)").await;
    assert_eq!(writer.expect().await, (1, OK.to_vec()));
    writer.query("INSERT INTO t VALUES ('shared')").await;
    assert_eq!(writer.expect().await, (1, OK.to_vec()));

    let mut reader = connect(server.addr).await;
    reader.login(Some("pw")).await;
    reader.query("SELECT v FROM t").await;
    assert_eq!(reader.read_result_set(1).await.rows, vec![vec!["shared"]]);

    // the first session is still usable
    writer.query("SHOW DATABASES").await;
    assert_eq!(writer.read_result_set(1).await.rows, vec![vec!["sqlite3"]]);
}

#[tokio::test]
async fn failing_session_does_not_affect_others() {
    let server = start(None).await;

    let mut bad = connect(server.addr).await;
    bad.login(None).await;
    let mut good = connect(server.addr).await;
    good.login(None).await;

    bad.query("SELECT * FROM no_such_table").await;
    let (_, payload) = bad.expect().await;
    let err = read_err(&payload).unwrap();
    assert_eq!(err.error_code, 1105);
    assert!(err.message.contains("no such table"), "{}", err.message);
    assert_eq!(bad.recv().await, None);

    good.query("SELECT 1 AS x").await;
    let result = good.read_result_set(1).await;
    assert_eq!(result.columns, vec!["x"]);
    assert_eq!(result.rows, vec![vec!["1"]]);

    // the listener still accepts
    let mut late = connect(server.addr).await;
    late.login(None).await;
}

#[tokio::test]
async fn wrong_password_over_tcp() {
    let server = start(Some("secret")).await;
    let mut client = connect(server.addr).await;

    let (_, _greeting) = client.expect().await;
    client
        .send(&handshake_response(client_caps(), b"vortex", &[0u8; 20]), 1)
        .await;
    assert_eq!(client.expect().await, (2, ACCESS_DENIED.to_vec()));
    assert_eq!(client.recv().await, None);
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let server = start(None).await;
    let addr = server.addr;
    server.shutdown.send(()).unwrap();
    assert!(server.task.await.unwrap().is_ok());

    assert!(TcpStream::connect(addr).await.is_err());
}

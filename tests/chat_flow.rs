//! End-to-end chat scenarios over in-memory duplex streams.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{
    duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};
use tokio::task::JoinHandle;

use relay_chat::{handle_connection, AppError, ChatServer, RegistryHandle, ServerConfig};

struct TestClient {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
    task: JoinHandle<Result<(), AppError>>,
}

impl TestClient {
    fn connect(registry: &RegistryHandle, config: &Arc<ServerConfig>) -> Self {
        let (client, server) = duplex(64 * 1024);
        let task = tokio::spawn(handle_connection(
            server,
            registry.clone(),
            Arc::clone(config),
        ));
        let (reader, writer) = tokio::io::split(client);
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
            task,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> Option<String> {
        self.lines.next_line().await.unwrap()
    }

    async fn expect(&mut self, expected: &str) {
        assert_eq!(self.recv().await.as_deref(), Some(expected));
    }

    /// Complete name negotiation with `name`
    async fn join(&mut self, name: &str) {
        self.expect("Enter your name.").await;
        self.send(name).await;
        self.expect(&format!("Welcome {} to our chat room.", name))
            .await;
        self.expect("To leave enter /quit in a new line.").await;
    }
}

fn setup(config: ServerConfig) -> (RegistryHandle, Arc<ServerConfig>) {
    let registry = ChatServer::spawn(config.max_sessions);
    (registry, Arc::new(config))
}

/// Connect and name three clients; every join announcement is consumed.
async fn three_clients(
    registry: &RegistryHandle,
    config: &Arc<ServerConfig>,
) -> (TestClient, TestClient, TestClient) {
    let mut a = TestClient::connect(registry, config);
    a.join("A").await;

    let mut b = TestClient::connect(registry, config);
    b.join("B").await;
    a.expect("*** A new user B entered the chat room !!! ***").await;

    let mut c = TestClient::connect(registry, config);
    c.join("C").await;
    a.expect("*** A new user C entered the chat room !!! ***").await;
    b.expect("*** A new user C entered the chat room !!! ***").await;

    (a, b, c)
}

async fn expect_who(client: &mut TestClient, names: &[&str]) {
    client.send("/who").await;
    for name in names {
        client.expect(name).await;
    }
}

#[tokio::test]
async fn test_broadcast_and_who() {
    let (registry, config) = setup(ServerConfig::default());
    let (mut a, mut b, mut c) = three_clients(&registry, &config).await;

    a.send("/all ping").await;
    b.expect("<A> ping").await;
    c.expect("<A> ping").await;

    // A's next line is the /who reply, not its own broadcast
    expect_who(&mut a, &["A", "B", "C"]).await;
}

#[tokio::test]
async fn test_private_message_is_echoed_to_sender_only() {
    let (registry, config) = setup(ServerConfig::default());
    let (mut a, mut b, mut c) = three_clients(&registry, &config).await;

    a.send("@B psst").await;
    b.expect("<A> psst").await;
    a.expect("<A> psst").await;

    expect_who(&mut c, &["A", "B", "C"]).await;
}

#[tokio::test]
async fn test_private_message_to_unknown_target_is_dropped() {
    let (registry, config) = setup(ServerConfig::default());
    let (mut a, mut b, _c) = three_clients(&registry, &config).await;

    a.send("@Nobody hello").await;
    a.send("@B").await;
    expect_who(&mut a, &["A", "B", "C"]).await;
    expect_who(&mut b, &["A", "B", "C"]).await;
}

#[tokio::test]
async fn test_name_rejections_then_accept() {
    let (registry, config) = setup(ServerConfig::default());
    let mut a = TestClient::connect(&registry, &config);
    a.join("Artur").await;

    let mut b = TestClient::connect(&registry, &config);
    b.expect("Enter your name.").await;
    b.send("Artur").await;
    b.expect("The user name :Artur is already used.").await;
    b.expect("Enter your name.").await;
    b.send("Artur@Home").await;
    b.expect("The name should not contain @ character").await;
    b.expect("Enter your name.").await;
    b.send("  Carol  ").await;
    b.expect("Welcome Carol to our chat room.").await;
    b.expect("To leave enter /quit in a new line.").await;

    a.expect("*** A new user Carol entered the chat room !!! ***")
        .await;
}

#[tokio::test]
async fn test_name_negotiation_exhausted() {
    let (registry, config) = setup(ServerConfig {
        max_name_tries: 2,
        ..ServerConfig::default()
    });
    let mut a = TestClient::connect(&registry, &config);

    for _ in 0..2 {
        a.expect("Enter your name.").await;
        a.send("bad@name").await;
        a.expect("The name should not contain @ character").await;
    }
    a.expect("Assigning user name unsuccessful. Closing connection.")
        .await;
    assert_eq!(a.recv().await, None);

    let result = a.task.await.unwrap();
    assert!(matches!(
        result,
        Err(AppError::NameNegotiationExhausted { tries: 2 })
    ));
}

#[tokio::test]
async fn test_registry_full_rejects_connection() {
    let (registry, config) = setup(ServerConfig {
        max_sessions: 1,
        ..ServerConfig::default()
    });
    let mut a = TestClient::connect(&registry, &config);
    a.join("A").await;

    let mut b = TestClient::connect(&registry, &config);
    assert_eq!(b.recv().await, None);
    let result = b.task.await.unwrap();
    assert!(matches!(
        result,
        Err(AppError::CapacityExceeded { capacity: 1 })
    ));
}

#[tokio::test]
async fn test_quit_announces_and_frees_name() {
    let (registry, config) = setup(ServerConfig::default());
    let (mut a, mut b, mut c) = three_clients(&registry, &config).await;

    a.send("/quit").await;
    b.expect("*** The user A is leaving the chat room !!! ***").await;
    c.expect("*** The user A is leaving the chat room !!! ***").await;
    assert_eq!(a.recv().await, None);
    assert!(a.task.await.unwrap().is_ok());

    expect_who(&mut b, &["B", "C"]).await;

    // The name can be reused
    let mut d = TestClient::connect(&registry, &config);
    d.join("A").await;
}

#[tokio::test]
async fn test_abrupt_disconnect_announces_leave() {
    let (registry, config) = setup(ServerConfig::default());
    let (a, mut b, _c) = three_clients(&registry, &config).await;

    let TestClient {
        lines,
        writer,
        task,
    } = a;
    drop(lines);
    drop(writer);

    b.expect("*** The user A is leaving the chat room !!! ***").await;
    assert!(task.await.unwrap().is_ok());
    expect_who(&mut b, &["B", "C"]).await;
}

#[tokio::test(start_paused = true)]
async fn test_inactive_session_is_closed() {
    let (registry, config) = setup(ServerConfig::default());
    let mut a = TestClient::connect(&registry, &config);
    a.join("A").await;
    let mut b = TestClient::connect(&registry, &config);
    b.join("B").await;
    a.expect("*** A new user B entered the chat room !!! ***").await;

    // B stays active halfway through A's idle window
    tokio::time::advance(Duration::from_secs(30)).await;
    b.send("/help").await;
    b.expect("Usage:").await;
    for _ in 0..6 {
        b.recv().await.unwrap();
    }

    let notice = a.recv().await.unwrap();
    assert!(notice.starts_with("You have been inactive for :"));
    assert!(notice.ends_with("and maximum allowed is 60 seconds."));
    a.expect("Closing connection to chat server").await;
    assert_eq!(a.recv().await, None);

    b.expect("*** The user A is leaving the chat room !!! ***").await;
    expect_who(&mut b, &["B"]).await;
}

#[tokio::test]
async fn test_broadcast_burst_arrives_complete_and_in_order() {
    let (registry, config) = setup(ServerConfig::default());
    let mut a = TestClient::connect(&registry, &config);
    a.join("A").await;
    let mut b = TestClient::connect(&registry, &config);
    b.join("B").await;
    a.expect("*** A new user B entered the chat room !!! ***").await;

    let mut burst = String::new();
    for n in 0..100 {
        burst.push_str(&format!("/all line {}\n", n));
    }
    burst.push_str("/all END\n");
    a.writer.write_all(burst.as_bytes()).await.unwrap();

    for n in 0..100 {
        b.expect(&format!("<A> line {}", n)).await;
    }
    b.expect("<A> END").await;
}

#[tokio::test]
async fn test_blank_name_is_accepted_as_empty() {
    let (registry, config) = setup(ServerConfig::default());
    let mut a = TestClient::connect(&registry, &config);
    a.join("A").await;

    let mut b = TestClient::connect(&registry, &config);
    b.expect("Enter your name.").await;
    b.send("   ").await;
    b.expect("Welcome  to our chat room.").await;
    b.expect("To leave enter /quit in a new line.").await;
    a.expect("*** A new user  entered the chat room !!! ***").await;

    expect_who(&mut a, &["A", ""]).await;

    // Only one session may hold the empty name
    let mut c = TestClient::connect(&registry, &config);
    c.expect("Enter your name.").await;
    c.send("").await;
    c.expect("The user name : is already used.").await;
    c.expect("Enter your name.").await;
}

#[tokio::test(start_paused = true)]
async fn test_line_arriving_after_idle_threshold_closes_session() {
    let (registry, config) = setup(ServerConfig {
        read_timeout: Duration::from_secs(120),
        ..ServerConfig::default()
    });
    let mut a = TestClient::connect(&registry, &config);
    a.join("A").await;
    let mut b = TestClient::connect(&registry, &config);
    b.join("B").await;
    a.expect("*** A new user B entered the chat room !!! ***").await;

    // Past the 60s threshold but inside the read deadline
    tokio::time::advance(Duration::from_secs(70)).await;
    a.send("/all late").await;

    // The late line is still handled before the session closes
    b.expect("<A> late").await;
    a.expect("You have been inactive for :70 and maximum allowed is 60 seconds.")
        .await;
    a.expect("Closing connection to chat server").await;
    assert_eq!(a.recv().await, None);

    b.expect("*** The user A is leaving the chat room !!! ***").await;
    expect_who(&mut b, &["B"]).await;
}

#[tokio::test(start_paused = true)]
async fn test_session_ends_when_peer_never_reads() {
    let (registry, config) = setup(ServerConfig::default());
    let (mut client, server) = duplex(64);
    let task = tokio::spawn(handle_connection(server, registry.clone(), config));

    // The greeting alone overflows the pipe, so the writer stalls
    client.write_all(b"A\n/quit\n").await.unwrap();

    assert!(task.await.unwrap().is_ok());
    assert!(registry.list_active_names().await.unwrap().is_empty());
    drop(client);
}

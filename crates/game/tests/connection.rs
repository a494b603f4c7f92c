use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use baize::net::rand_u64;
use baize::{
    AimState, Channel, ClientMessage, ConnectionError, ConnectionManager, ConnectionState,
    NetworkEndpoint, Packet, PacketType, PhysicsParams, Rack, Reliability, ServerMessage, Table,
    TableGeometry, TableSnapshot,
};

static PORT_COUNTER: AtomicU16 = AtomicU16::new(41000);

fn next_port() -> u16 {
    PORT_COUNTER.fetch_add(10, Ordering::SeqCst)
}

fn local(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

fn pair() -> (NetworkEndpoint, NetworkEndpoint, SocketAddr) {
    let port = next_port();
    let server = NetworkEndpoint::bind(local(port)).unwrap();
    let mut client = NetworkEndpoint::bind(local(port + 1)).unwrap();
    client.set_remote(local(port));
    (server, client, local(port))
}

fn wait_for_packet(endpoint: &mut NetworkEndpoint, timeout_ms: u64) -> Option<Vec<(Packet, SocketAddr)>> {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        let received = endpoint.receive().unwrap();
        if !received.is_empty() {
            return Some(received);
        }
        thread::sleep(Duration::from_millis(1));
    }
    None
}

#[test]
fn handshake_full_flow() {
    let (mut server, mut client, _) = pair();
    let mut connections = ConnectionManager::new(32);
    let client_salt = rand_u64();

    let request = client.create_packet(PacketType::ConnectionRequest { client_salt });
    client.send(&request).unwrap();

    let received = wait_for_packet(&mut server, 200).expect("no request");
    let (packet, from) = &received[0];
    let PacketType::ConnectionRequest { client_salt: salt } = packet.payload else {
        panic!("expected ConnectionRequest");
    };
    assert_eq!(salt, client_salt);
    let pending = connections.get_or_create_pending(*from, salt).unwrap();
    let challenge = PacketType::ConnectionChallenge {
        server_salt: pending.server_salt,
        challenge: pending.combined_salt(),
    };
    let reply = server.create_packet(challenge);
    server.send_to(&reply, *from).unwrap();

    let received = wait_for_packet(&mut client, 200).expect("no challenge");
    let PacketType::ConnectionChallenge {
        server_salt,
        challenge,
    } = received[0].0.payload
    else {
        panic!("expected ConnectionChallenge");
    };
    assert_eq!(challenge, client_salt ^ server_salt);
    let response = client.create_packet(PacketType::ChallengeResponse {
        combined_salt: challenge,
    });
    client.send(&response).unwrap();

    let received = wait_for_packet(&mut server, 200).expect("no response");
    let (packet, from) = &received[0];
    let PacketType::ChallengeResponse { combined_salt } = packet.payload else {
        panic!("expected ChallengeResponse");
    };
    let pending = connections.get_by_addr_mut(from).unwrap();
    pending.accept_challenge(combined_salt).unwrap();
    let client_id = pending.client_id;
    let accepted = pending.send_packet(
        PacketType::ConnectionAccepted { client_id },
        Reliability::Reliable,
    );
    server.send_to(&accepted, *from).unwrap();

    let received = wait_for_packet(&mut client, 200).expect("no acceptance");
    assert!(matches!(
        received[0].0.payload,
        PacketType::ConnectionAccepted { client_id: id } if id > 0
    ));
    assert_eq!(connections.connected_count(), 1);
}

#[test]
fn full_server_denies() {
    let (mut server, mut client, _) = pair();
    let mut connections = ConnectionManager::new(0);

    let request = client.create_packet(PacketType::ConnectionRequest {
        client_salt: rand_u64(),
    });
    client.send(&request).unwrap();

    let received = wait_for_packet(&mut server, 200).expect("no request");
    let (packet, from) = &received[0];
    let PacketType::ConnectionRequest { client_salt } = packet.payload else {
        panic!("expected ConnectionRequest");
    };
    let err = connections
        .get_or_create_pending(*from, client_salt)
        .err()
        .expect("server should be full");
    assert_eq!(err, ConnectionError::ServerFull);
    let denied = server.create_packet(PacketType::ConnectionDenied {
        reason: err.to_string(),
    });
    server.send_to(&denied, *from).unwrap();

    let received = wait_for_packet(&mut client, 200).expect("no denial");
    match &received[0].0.payload {
        PacketType::ConnectionDenied { reason } => assert!(reason.contains("full")),
        other => panic!("expected ConnectionDenied, got {other:?}"),
    }
}

#[test]
fn wrong_challenge_keeps_client_pending() {
    let (mut server, mut client, _) = pair();
    let mut connections = ConnectionManager::new(8);
    let client_salt = rand_u64();

    let request = client.create_packet(PacketType::ConnectionRequest { client_salt });
    client.send(&request).unwrap();
    let received = wait_for_packet(&mut server, 200).expect("no request");
    let from = received[0].1;
    connections.get_or_create_pending(from, client_salt).unwrap();

    let response = client.create_packet(PacketType::ChallengeResponse {
        combined_salt: 0xDEAD_BEEF,
    });
    client.send(&response).unwrap();
    let received = wait_for_packet(&mut server, 200).expect("no response");
    let PacketType::ChallengeResponse { combined_salt } = received[0].0.payload else {
        panic!("expected ChallengeResponse");
    };
    let pending = connections.get_by_addr_mut(&from).unwrap();
    assert_eq!(
        pending.accept_challenge(combined_salt),
        Err(ConnectionError::BadChallenge)
    );
    assert_eq!(pending.state, ConnectionState::Connecting);
    assert_eq!(connections.connected_count(), 0);
}

#[test]
fn ping_pong_carries_both_clocks() {
    let (mut server, mut client, _) = pair();

    let ping = client.create_packet(PacketType::Ping { client_time_ms: 12345 });
    client.send(&ping).unwrap();

    let received = wait_for_packet(&mut server, 200).expect("no ping");
    let (packet, from) = &received[0];
    let PacketType::Ping { client_time_ms } = packet.payload else {
        panic!("expected Ping");
    };
    let pong = server.create_packet(PacketType::Pong {
        client_time_ms,
        server_time_ms: 999,
    });
    server.send_to(&pong, *from).unwrap();

    let received = wait_for_packet(&mut client, 200).expect("no pong");
    assert!(matches!(
        received[0].0.payload,
        PacketType::Pong {
            client_time_ms: 12345,
            server_time_ms: 999
        }
    ));
}

#[test]
fn hit_and_snapshot_cross_the_wire() {
    let (mut server, mut client, _) = pair();
    let mut client_channel = Channel::new();
    let mut server_channel = Channel::new();

    let aim = AimState::new(0.5, 3.0).with_offset(0.0, 0.25);
    let hit = client_channel.send(
        PacketType::Client(ClientMessage::Hit { aim, sequence: 1 }),
        Reliability::Reliable,
    );
    client.send(&hit).unwrap();

    let received = wait_for_packet(&mut server, 200).expect("no hit");
    let (packet, from) = received.into_iter().next().unwrap();
    match server_channel.receive(packet) {
        Some(PacketType::Client(ClientMessage::Hit { aim: got, sequence })) => {
            assert_eq!(got, aim);
            assert_eq!(sequence, 1);
        }
        other => panic!("expected hit, got {other:?}"),
    }

    let params = PhysicsParams::default();
    let geometry = TableGeometry::pool(params.ball_radius);
    let mut table = Table::new(Rack::triangle(&geometry), geometry, params);
    table.hit(&aim).unwrap();
    table.advance(1.0 / 512.0).unwrap();
    let snapshot = TableSnapshot::capture(&table, 1, 2);
    let reply = server_channel.send(
        PacketType::Server(ServerMessage::Snapshot(snapshot.clone())),
        Reliability::Unreliable,
    );
    server.send_to(&reply, from).unwrap();

    let received = wait_for_packet(&mut client, 200).expect("no snapshot");
    let (packet, _) = received.into_iter().next().unwrap();
    match client_channel.receive(packet) {
        Some(PacketType::Server(ServerMessage::Snapshot(got))) => assert_eq!(got, snapshot),
        other => panic!("expected snapshot, got {other:?}"),
    }
    assert_eq!(client_channel.pending_reliable(), 0);
}

#[test]
fn endpoint_sequences_increase() {
    let mut endpoint = NetworkEndpoint::bind(local(next_port())).unwrap();
    let p1 = endpoint.create_packet(PacketType::Ping { client_time_ms: 1 });
    let p2 = endpoint.create_packet(PacketType::Ping { client_time_ms: 2 });
    let p3 = endpoint.create_packet(PacketType::Disconnect);
    assert_eq!(p1.header.sequence, 0);
    assert_eq!(p2.header.sequence, 1);
    assert_eq!(p3.header.sequence, 2);
}

#[test]
fn several_clients_connect() {
    let port = next_port();
    let mut server = NetworkEndpoint::bind(local(port)).unwrap();
    let mut connections = ConnectionManager::new(32);

    for i in 0..3u16 {
        let mut client = NetworkEndpoint::bind(local(port + 2 + i)).unwrap();
        client.set_remote(local(port));
        let request = client.create_packet(PacketType::ConnectionRequest {
            client_salt: rand_u64(),
        });
        client.send(&request).unwrap();

        let received = wait_for_packet(&mut server, 200).expect("no request");
        let (packet, from) = &received[0];
        if let PacketType::ConnectionRequest { client_salt } = packet.payload {
            let pending = connections.get_or_create_pending(*from, client_salt).unwrap();
            let salt = pending.combined_salt();
            pending.accept_challenge(salt).unwrap();
        }
    }

    assert_eq!(connections.connected_count(), 3);
    assert_eq!(connections.total_count(), 3);
}

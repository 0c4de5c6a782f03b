use core::net::SocketAddr;
use std::time::Duration;

use sntpm::{
    Client, ClientEndpoint, Error, KissCode, Mode, NtpContext, NtpTimestamp, PacketBuilder,
    PacketFields, ReceivedPacket, ReferenceId, RequestWindow, StdTimeSource, TimeSource,
};
use sntpm_net_tokio::UdpSocketWrapper;
use tokio::net::UdpSocket;

#[derive(Clone, Copy)]
enum Behaviour {
    Reply { offset: f64 },
    Kiss(ReferenceId),
    Silent,
}

/// Runs a minimal SNTP server on a loopback port
async fn serve(behaviour: Behaviour) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 128];

        loop {
            let (len, peer) = socket.recv_from(&mut buf).await.unwrap();
            let request = ReceivedPacket::decode(&buf[..len]).unwrap();
            let base = PacketBuilder::new()
                .with_version(4)
                .with_mode(Mode::Server)
                .with_originate_timestamp(request.transmit_timestamp());

            let reply = match behaviour {
                Behaviour::Reply { offset } => {
                    let now = NtpTimestamp::from_seconds(StdTimeSource.now() + offset);
                    base.with_stratum(2)
                        .with_poll(4)
                        .with_reference_id(ReferenceId::new([192, 0, 2, 1]))
                        .with_receive_timestamp(now)
                        .with_transmit_timestamp(now)
                }
                Behaviour::Kiss(code) => base.with_reference_id(code),
                Behaviour::Silent => continue,
            };

            socket.send_to(reply.encode().as_ref(), peer).await.unwrap();
        }
    });

    addr
}

async fn client(server: SocketAddr) -> Client<UdpSocketWrapper> {
    let socket = UdpSocketWrapper::bind("127.0.0.1:0").await.unwrap();

    Client::new(
        ClientEndpoint::new("127.0.0.1", server.port()),
        NtpContext::new(socket),
    )
}

#[tokio::test]
async fn test_query_loopback_server() {
    let server = serve(Behaviour::Reply { offset: 2.0 }).await;
    let outcome = client(server).await.query_time().await;
    let result = outcome.result.unwrap();

    assert!((result.offset() - 2.0).abs() < 0.1, "{}", result.offset());
    assert!(result.roundtrip() >= 0.0 && result.roundtrip() < 0.1);
    assert_eq!(result.stratum(), 2);
    assert_eq!(
        outcome.next_request_window,
        RequestWindow::At(outcome.request_date + 16.0)
    );
}

#[tokio::test]
async fn test_repeated_queries() {
    let server = serve(Behaviour::Reply { offset: -0.5 }).await;
    let client = client(server).await;

    for _ in 0..3 {
        let outcome = client.query_time().await;
        assert!((outcome.offset() + 0.5).abs() < 0.1);
    }
}

#[tokio::test]
async fn test_kiss_of_death_from_loopback_server() {
    let server = serve(Behaviour::Kiss(ReferenceId::RSTR)).await;
    let outcome = client(server).await.query_time().await;

    assert_eq!(outcome.result, Err(Error::AccessDenied(KissCode::Restricted)));
    assert_eq!(outcome.next_request_window, RequestWindow::DistantFuture);
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let server = serve(Behaviour::Silent).await;
    let client = client(server).await;
    client.set_timeout(Duration::from_millis(200));

    let outcome = client.query_time().await;

    assert_eq!(outcome.result, Err(Error::Timeout));
}

//! Integration tests for the length-prefixed TCP transport.
//!
//! The client side writes raw bytes so the tests control exactly how
//! frames are split across (or packed into) TCP segments.

#[cfg(feature = "tcp")]
mod tcp {
    use std::time::Duration;

    use matchforge_transport::{
        Connection, FramedTcpConnection, FramedTcpTransport, Transport,
        TransportError,
    };
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    async fn accept_raw(
        max_frame_len: usize,
    ) -> (FramedTcpConnection, TcpStream) {
        let mut transport = FramedTcpTransport::bind("127.0.0.1:0", max_frame_len)
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let client = TcpStream::connect(addr).await.expect("connect");
        (server.await.unwrap(), client)
    }

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut out = (payload.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[tokio::test]
    async fn test_recv_reassembles_frame_split_across_writes() {
        let (server_conn, mut client) = accept_raw(1024).await;
        let bytes = frame(b"{\"type\":\"leave_match\"}");

        // Header split in two, body dribbled after a pause.
        client.write_all(&bytes[..2]).await.unwrap();
        client.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.write_all(&bytes[2..9]).await.unwrap();
        client.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.write_all(&bytes[9..]).await.unwrap();

        let got = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(got, b"{\"type\":\"leave_match\"}");
    }

    #[tokio::test]
    async fn test_recv_separates_frames_sent_in_one_write() {
        let (server_conn, mut client) = accept_raw(1024).await;

        let mut both = frame(b"first");
        both.extend(frame(b"second"));
        client.write_all(&both).await.unwrap();

        assert_eq!(server_conn.recv().await.unwrap().unwrap(), b"first");
        assert_eq!(server_conn.recv().await.unwrap().unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_recv_clean_eof_returns_none() {
        let (server_conn, client) = accept_raw(1024).await;
        drop(client);

        let result = server_conn.recv().await.expect("clean close");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_recv_oversized_frame_is_rejected() {
        let (server_conn, mut client) = accept_raw(8).await;
        client.write_all(&frame(b"way more than eight")).await.unwrap();

        let result = server_conn.recv().await;
        assert!(matches!(
            result,
            Err(TransportError::FrameTooLarge { len: 19, max: 8 })
        ));
    }

    #[tokio::test]
    async fn test_connect_round_trip_between_framed_peers() {
        let mut transport = FramedTcpTransport::bind("127.0.0.1:0", 1024)
            .await
            .unwrap();
        let addr = transport.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move { transport.accept().await.unwrap() });

        let client = FramedTcpConnection::connect(&addr, 1024).await.unwrap();
        let server_conn = server.await.unwrap();

        client.send(b"hello").await.unwrap();
        assert_eq!(server_conn.recv().await.unwrap().unwrap(), b"hello");

        server_conn.send(b"world").await.unwrap();
        assert_eq!(client.recv().await.unwrap().unwrap(), b"world");
    }
}

//! DNS message exchange with a single nameserver.
//!
//! Provides abstraction over the wire exchange to enable:
//! - Testing the query pipeline with mock nameservers
//! - Swapping transports without touching classification

use std::future::Future;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use hickory_proto::op::Message;
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tracing::debug;

use crate::error::QueryError;

/// Receive buffer for UDP responses. Plain DNS caps responses at 512 bytes
/// but some servers ignore that without EDNS.
pub const UDP_RECV_BUFFER_SIZE: usize = 4096;

/// Trait for sending a DNS message and receiving its response.
pub trait DnsExchange: Send + Sync + Clone + 'static {
    /// Send `query` to `server` and return its response.
    fn exchange(
        &self,
        query: &Message,
        server: SocketAddr,
    ) -> impl Future<Output = Result<Message, QueryError>> + Send;
}

/// UDP exchange with TCP fallback when the response comes back truncated.
///
/// The whole round trip, fallback included, runs under one deadline.
#[derive(Debug, Clone, Copy)]
pub struct UdpTcpExchange {
    timeout: Duration,
}

impl UdpTcpExchange {
    /// Create an exchange bounded by `timeout` per query.
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn exchange_udp(query: &Message, server: SocketAddr) -> Result<Message, QueryError> {
        let transport = |source| QueryError::Transport {
            nameserver: server,
            source,
        };

        let bind_addr: SocketAddr = if server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr).await.map_err(transport)?;
        socket.connect(server).await.map_err(transport)?;

        let query_bytes = encode(query, server)?;
        socket.send(&query_bytes).await.map_err(transport)?;

        let mut response_buf = [0u8; UDP_RECV_BUFFER_SIZE];
        loop {
            let len = socket.recv(&mut response_buf).await.map_err(transport)?;
            let response = decode(&response_buf[..len], server)?;
            // Stray datagrams for another transaction are dropped.
            if response.id() == query.id() {
                return Ok(response);
            }
            debug!(%server, expected = query.id(), got = response.id(), "ignoring mismatched response id");
        }
    }

    async fn exchange_tcp(query: &Message, server: SocketAddr) -> Result<Message, QueryError> {
        let transport = |source| QueryError::Transport {
            nameserver: server,
            source,
        };

        let mut stream = TcpStream::connect(server).await.map_err(transport)?;
        stream.set_nodelay(true).map_err(transport)?;

        let query_bytes = encode(query, server)?;
        let len = u16::try_from(query_bytes.len()).map_err(|_| {
            transport(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "query exceeds 65535 bytes",
            ))
        })?;
        let mut framed = Vec::with_capacity(query_bytes.len() + 2);
        framed.extend_from_slice(&len.to_be_bytes());
        framed.extend_from_slice(&query_bytes);
        stream.write_all(&framed).await.map_err(transport)?;

        let response_len = stream.read_u16().await.map_err(transport)?;
        let mut response_buf = vec![0u8; usize::from(response_len)];
        stream
            .read_exact(&mut response_buf)
            .await
            .map_err(transport)?;

        decode(&response_buf, server)
    }

    async fn exchange_inner(query: &Message, server: SocketAddr) -> Result<Message, QueryError> {
        let response = Self::exchange_udp(query, server).await?;
        if !response.truncated() {
            return Ok(response);
        }

        debug!(%server, "truncated UDP response, retrying over TCP");
        Self::exchange_tcp(query, server).await
    }
}

impl DnsExchange for UdpTcpExchange {
    async fn exchange(&self, query: &Message, server: SocketAddr) -> Result<Message, QueryError> {
        tokio::time::timeout(self.timeout, Self::exchange_inner(query, server))
            .await
            .map_err(|_| QueryError::Timeout { nameserver: server })?
    }
}

fn encode(query: &Message, server: SocketAddr) -> Result<Vec<u8>, QueryError> {
    query.to_bytes().map_err(|source| QueryError::Malformed {
        nameserver: server,
        source,
    })
}

fn decode(bytes: &[u8], server: SocketAddr) -> Result<Message, QueryError> {
    Message::from_bytes(bytes).map_err(|source| QueryError::Malformed {
        nameserver: server,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::{MessageType, OpCode, Query, ResponseCode};
    use hickory_proto::rr::rdata::A;
    use hickory_proto::rr::{Name, RData, Record, RecordType};
    use std::str::FromStr;
    use tokio::net::TcpListener;

    fn create_query(domain: &str, id: u16) -> Message {
        let mut message = Message::new();
        message
            .set_id(id)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .add_query(Query::query(Name::from_str(domain).unwrap(), RecordType::A));
        message
    }

    fn create_response(query: &Message, truncated: bool) -> Message {
        let mut response = Message::new();
        response
            .set_id(query.id())
            .set_message_type(MessageType::Response)
            .set_op_code(OpCode::Query)
            .set_response_code(ResponseCode::NoError)
            .set_truncated(truncated);
        if !truncated {
            let name = query.queries()[0].name().clone();
            response.add_answer(Record::from_rdata(
                name,
                60,
                RData::A(A(Ipv4Addr::new(198, 51, 100, 9))),
            ));
        }
        response
    }

    #[tokio::test]
    async fn should_exchange_over_udp() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let (len, peer) = server.recv_from(&mut buf).await.unwrap();
            let query = Message::from_bytes(&buf[..len]).unwrap();
            let bytes = create_response(&query, false).to_bytes().unwrap();
            server.send_to(&bytes, peer).await.unwrap();
        });

        let exchange = UdpTcpExchange::new(Duration::from_secs(2));
        let response = exchange
            .exchange(&create_query("a.test.", 7), addr)
            .await
            .unwrap();

        assert_eq!(response.id(), 7);
        assert_eq!(response.answers().len(), 1);
    }

    #[tokio::test]
    async fn should_ignore_responses_with_wrong_id() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let (len, peer) = server.recv_from(&mut buf).await.unwrap();
            let query = Message::from_bytes(&buf[..len]).unwrap();

            let mut stray = create_response(&query, false);
            stray.set_id(query.id().wrapping_add(1));
            server
                .send_to(&stray.to_bytes().unwrap(), peer)
                .await
                .unwrap();

            let bytes = create_response(&query, false).to_bytes().unwrap();
            server.send_to(&bytes, peer).await.unwrap();
        });

        let exchange = UdpTcpExchange::new(Duration::from_secs(2));
        let response = exchange
            .exchange(&create_query("a.test.", 42), addr)
            .await
            .unwrap();

        assert_eq!(response.id(), 42);
    }

    #[tokio::test]
    async fn should_fall_back_to_tcp_on_truncation() {
        let udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = udp.local_addr().unwrap();
        let tcp = TcpListener::bind(addr).await.unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let (len, peer) = udp.recv_from(&mut buf).await.unwrap();
            let query = Message::from_bytes(&buf[..len]).unwrap();
            let bytes = create_response(&query, true).to_bytes().unwrap();
            udp.send_to(&bytes, peer).await.unwrap();
        });

        tokio::spawn(async move {
            let (mut stream, _) = tcp.accept().await.unwrap();
            let len = stream.read_u16().await.unwrap();
            let mut buf = vec![0u8; usize::from(len)];
            stream.read_exact(&mut buf).await.unwrap();
            let query = Message::from_bytes(&buf).unwrap();

            let bytes = create_response(&query, false).to_bytes().unwrap();
            stream
                .write_all(&(bytes.len() as u16).to_be_bytes())
                .await
                .unwrap();
            stream.write_all(&bytes).await.unwrap();
        });

        let exchange = UdpTcpExchange::new(Duration::from_secs(2));
        let response = exchange
            .exchange(&create_query("a.test.", 9), addr)
            .await
            .unwrap();

        assert!(!response.truncated());
        assert_eq!(response.answers().len(), 1);
    }

    #[tokio::test]
    async fn should_time_out_on_silent_server() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();

        let exchange = UdpTcpExchange::new(Duration::from_millis(100));
        let result = exchange.exchange(&create_query("a.test.", 1), addr).await;

        assert!(matches!(result, Err(QueryError::Timeout { nameserver }) if nameserver == addr));
        drop(server);
    }
}

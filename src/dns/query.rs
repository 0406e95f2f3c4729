//! Single (domain, nameserver) queries.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{Name, RecordType};
use tracing::{debug, instrument};

use super::answer::{Answer, classify};
use super::client::DnsExchange;
use crate::error::QueryError;

/// Build an `A` query for `domain` with recursion desired.
///
/// `domain` is made fully qualified if it is not already.
pub fn build_query(domain: &str, id: u16) -> Result<Message, QueryError> {
    let fqdn = if domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{domain}.")
    };
    let name = Name::from_str(&fqdn).map_err(|source| QueryError::InvalidDomain {
        domain: domain.to_string(),
        source,
    })?;

    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(name, RecordType::A));
    Ok(message)
}

/// Queries one nameserver for one domain and classifies the answer.
#[derive(Debug, Clone)]
pub struct QueryEngine<E> {
    exchange: E,
    port: u16,
}

impl<E: DnsExchange> QueryEngine<E> {
    /// Create an engine that talks to nameservers on `port`.
    pub const fn new(exchange: E, port: u16) -> Self {
        Self { exchange, port }
    }

    /// Ask `nameserver` for the `A` records of `domain`.
    ///
    /// Anything but `NOERROR` is a [`QueryError::NoAnswer`]. A `NOERROR`
    /// response with an empty answer section is still an [`Answer`], just
    /// one without records.
    #[instrument(skip(self), level = "debug")]
    pub async fn query(&self, domain: &str, nameserver: IpAddr) -> Result<Answer, QueryError> {
        let server = SocketAddr::new(nameserver, self.port);
        // Ids must not be guessable by an off-path sender.
        let request = build_query(domain, fastrand::u16(..))?;

        let response = self.exchange.exchange(&request, server).await?;
        if response.response_code() != ResponseCode::NoError {
            debug!(rcode = %response.response_code(), "nameserver refused to answer");
            return Err(QueryError::NoAnswer { nameserver: server });
        }

        Ok(Answer {
            nameserver,
            domain: domain.to_string(),
            records: classify(response.answers()),
        })
    }
}

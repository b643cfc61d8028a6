#[cfg(feature = "tls")]
use alloc::{string::String, vec::Vec};
use embassy_net::{
    Stack,
    dns::{DnsQueryType, Error as DnsError},
    tcp::{ConnectError, TcpSocket},
};
use embassy_time::Duration;
#[cfg(feature = "tls")]
use embedded_tls::{Aes128GcmSha256, TlsConfig, TlsConnection, TlsContext, UnsecureProvider};
use rand_chacha::ChaCha20Rng;

#[cfg(feature = "tls")]
use crate::constants::TLS_BUFFER_MAX;
use crate::constants::{HTTP_TIMEOUT_SECS, RX_BUFFER_SIZE, TX_BUFFER_SIZE};

#[derive(Debug)]
pub enum Error {
    #[allow(dead_code)]
    DnsQueryFailed(DnsError),
    DnsLookupFailed,
    #[allow(dead_code)]
    SocketConnectionError(ConnectError),
    #[cfg(feature = "tls")]
    TlsHandshakeFailed,
    #[cfg(feature = "tls")]
    PemParseError,
}

#[cfg(feature = "tls")]
pub type Session<'a> = TlsConnection<'a, TcpSocket<'a>, Aes128GcmSha256>;
#[cfg(feature = "tls")]
pub type SessionError = embedded_tls::TlsError;

#[cfg(not(feature = "tls"))]
pub type Session<'a> = TcpSocket<'a>;
#[cfg(not(feature = "tls"))]
pub type SessionError = embassy_net::tcp::Error;

/// Socket and record buffers reused by every connection.
pub struct Buffers {
    rx: [u8; RX_BUFFER_SIZE],
    tx: [u8; TX_BUFFER_SIZE],
    #[cfg(feature = "tls")]
    tls_read: [u8; TLS_BUFFER_MAX],
    #[cfg(feature = "tls")]
    tls_write: [u8; TLS_BUFFER_MAX],
}

impl Buffers {
    pub const fn new() -> Self {
        Self {
            rx: [0; RX_BUFFER_SIZE],
            tx: [0; TX_BUFFER_SIZE],
            #[cfg(feature = "tls")]
            tls_read: [0; TLS_BUFFER_MAX],
            #[cfg(feature = "tls")]
            tls_write: [0; TLS_BUFFER_MAX],
        }
    }
}

impl Default for Buffers {
    fn default() -> Self {
        Self::new()
    }
}

/// An open session. Dropping it closes the connection and frees the
/// buffers for the next one.
pub struct Transport<'a> {
    pub session: Session<'a>,
}

impl<'a> Transport<'a> {
    async fn open_socket(
        stack: Stack<'static>,
        rx_buffer: &'a mut [u8],
        tx_buffer: &'a mut [u8],
        hostname: &str,
        port: u16,
    ) -> Result<TcpSocket<'a>, Error> {
        let mut socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
        socket.set_timeout(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)));

        let addr = stack
            .dns_query(hostname, DnsQueryType::A)
            .await
            .map_err(Error::DnsQueryFailed)?
            .first()
            .copied()
            .ok_or(Error::DnsLookupFailed)?;

        log::debug!("Connecting TCP socket to {}:{}", hostname, port);
        socket
            .connect((addr, port))
            .await
            .map_err(Error::SocketConnectionError)?;
        log::debug!("TCP connected");

        Ok(socket)
    }

    #[cfg(feature = "tls")]
    pub async fn connect(
        stack: Stack<'static>,
        rng: &mut ChaCha20Rng,
        buffers: &'a mut Buffers,
        hostname: &str,
        port: u16,
        ca_chain: Option<&str>,
    ) -> Result<Self, Error> {
        let socket =
            Self::open_socket(stack, &mut buffers.rx, &mut buffers.tx, hostname, port).await?;

        let ca_der = ca_chain.map(decode_pem).transpose()?;

        let mut config = TlsConfig::new().with_server_name(hostname);
        if let Some(ca_der) = &ca_der {
            config = config.with_ca(embedded_tls::Certificate::X509(ca_der));
            log::debug!("CA certificate loaded: {} bytes", ca_der.len());
        }

        let mut tls: Session<'a> =
            TlsConnection::new(socket, &mut buffers.tls_read, &mut buffers.tls_write);

        log::debug!("Starting TLS handshake with {}", hostname);
        let crypto_provider = UnsecureProvider::new::<Aes128GcmSha256>(rng);
        tls.open(TlsContext::new(&config, crypto_provider))
            .await
            .map_err(|e| {
                log::error!("TLS handshake failed: {:?}", e);
                Error::TlsHandshakeFailed
            })?;
        log::debug!("TLS handshake complete");

        Ok(Self { session: tls })
    }

    #[cfg(not(feature = "tls"))]
    pub async fn connect(
        stack: Stack<'static>,
        _rng: &mut ChaCha20Rng,
        buffers: &'a mut Buffers,
        hostname: &str,
        port: u16,
        _ca_chain: Option<&str>,
    ) -> Result<Self, Error> {
        let socket =
            Self::open_socket(stack, &mut buffers.rx, &mut buffers.tx, hostname, port).await?;

        Ok(Self { session: socket })
    }
}

#[cfg(feature = "tls")]
fn decode_pem(pem: &str) -> Result<Vec<u8>, Error> {
    use base64::Engine;
    let start_marker = "-----BEGIN";
    let end_marker = "-----END";
    let start = pem.find(start_marker).ok_or(Error::PemParseError)?;
    let begin_end = pem[start..].find('\n').ok_or(Error::PemParseError)? + start + 1;
    let end = pem.find(end_marker).ok_or(Error::PemParseError)?;

    let base64_content: String = pem[begin_end..end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD
        .decode(base64_content)
        .map_err(|_| Error::PemParseError)
}

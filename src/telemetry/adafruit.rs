use embassy_net::Stack;
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

use super::FeedClient;
use super::http::{self, FeedEndpoint, post_feed_value};
use crate::constants::RESPONSE_BUFFER_SIZE;
use crate::transport::{self, Buffers, SessionError, Transport};

#[derive(Debug)]
pub enum Error {
    #[allow(dead_code)]
    Transport(transport::Error),
    #[allow(dead_code)]
    Http(http::Error<SessionError>),
}

/// Adafruit IO REST client. Opens one connection per feed value.
pub struct AdafruitIo {
    stack: Stack<'static>,
    rng: ChaCha20Rng,
    buffers: &'static mut Buffers,
    host: &'static str,
    port: u16,
    username: &'static str,
    api_key: &'static str,
    tls_ca: Option<&'static str>,
}

impl AdafruitIo {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stack: Stack<'static>,
        seed: [u8; 32],
        buffers: &'static mut Buffers,
        host: &'static str,
        port: u16,
        username: &'static str,
        api_key: &'static str,
        tls_ca: Option<&'static str>,
    ) -> Self {
        Self {
            stack,
            rng: ChaCha20Rng::from_seed(seed),
            buffers,
            host,
            port,
            username,
            api_key,
            tls_ca,
        }
    }
}

impl FeedClient for AdafruitIo {
    type Error = Error;

    async fn publish(&mut self, feed: &str, value: &str) -> Result<u16, Self::Error> {
        let mut transport = Transport::connect(
            self.stack,
            &mut self.rng,
            &mut *self.buffers,
            self.host,
            self.port,
            self.tls_ca,
        )
        .await
        .map_err(Error::Transport)?;

        let endpoint = FeedEndpoint {
            host: self.host,
            username: self.username,
            api_key: self.api_key,
        };
        let mut response = [0u8; RESPONSE_BUFFER_SIZE];

        post_feed_value(&mut transport.session, &endpoint, feed, value, &mut response)
            .await
            .map_err(Error::Http)
    }
}

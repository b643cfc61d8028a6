use core::fmt::Write as _;

use embedded_io_async::{Read, Write};
use heapless::String;

#[derive(Debug)]
pub enum Error<E> {
    Io(E),
    /// Peer closed the connection before sending a status line
    ConnectionClosed,
    MalformedResponse,
}

/// Account and host a feed value is posted to.
#[derive(Clone, Copy, Debug)]
pub struct FeedEndpoint<'a> {
    pub host: &'a str,
    pub username: &'a str,
    pub api_key: &'a str,
}

const BODY_PREFIX: &str = "{\"value\": \"";
const BODY_SUFFIX: &str = "\"}";

/// POST `value` to `feed` and return the response status code.
///
/// `buf` receives the response head. The caller owns the session and is
/// expected to drop it right after, the request asks the server to close.
pub async fn post_feed_value<S>(
    session: &mut S,
    endpoint: &FeedEndpoint<'_>,
    feed: &str,
    value: &str,
    buf: &mut [u8],
) -> Result<u16, Error<S::Error>>
where
    S: Read + Write,
{
    // 20 digits hold any usize
    let mut content_length: String<20> = String::new();
    write!(
        content_length,
        "{}",
        BODY_PREFIX.len() + value.len() + BODY_SUFFIX.len()
    )
    .ok();

    let parts = [
        "POST /api/v2/",
        endpoint.username,
        "/feeds/",
        feed,
        "/data HTTP/1.1\r\nHost: ",
        endpoint.host,
        "\r\nContent-Type: application/json\r\nX-AIO-Key: ",
        endpoint.api_key,
        "\r\nContent-Length: ",
        content_length.as_str(),
        "\r\nConnection: close\r\n\r\n",
        BODY_PREFIX,
        value,
        BODY_SUFFIX,
    ];
    for part in parts {
        session.write_all(part.as_bytes()).await.map_err(Error::Io)?;
    }
    session.flush().await.map_err(Error::Io)?;

    let mut total_read = 0;
    while total_read < buf.len() {
        let n = session
            .read(&mut buf[total_read..])
            .await
            .map_err(Error::Io)?;
        if n == 0 {
            break;
        }
        total_read += n;
        if find_header_end(&buf[..total_read]).is_some() {
            break;
        }
    }

    if total_read == 0 {
        return Err(Error::ConnectionClosed);
    }

    let status = parse_status_line(&buf[..total_read]).ok_or(Error::MalformedResponse)?;
    log::debug!("{} responded with status {}", endpoint.host, status);
    Ok(status)
}

/// Status code from the first line of a response (`HTTP/1.1 200 OK`).
pub fn parse_status_line(head: &[u8]) -> Option<u16> {
    let line_end = head.windows(2).position(|w| w == b"\r\n")?;
    let line = core::str::from_utf8(&head[..line_end]).ok()?;

    let mut fields = line.split(' ');
    if !fields.next()?.starts_with("HTTP/") {
        return None;
    }
    fields.next()?.parse().ok()
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embassy_futures::block_on;
    use embedded_io_async::ErrorType;

    /// Records writes and serves a canned response in small chunks.
    struct MockSession {
        written: Vec<u8>,
        response: &'static [u8],
        chunk: usize,
        flushed: bool,
    }

    impl MockSession {
        fn new(response: &'static [u8]) -> Self {
            Self {
                written: Vec::new(),
                response,
                chunk: 7,
                flushed: false,
            }
        }

        fn request(&self) -> &str {
            core::str::from_utf8(&self.written).unwrap()
        }
    }

    impl ErrorType for MockSession {
        type Error = Infallible;
    }

    impl Read for MockSession {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let n = self.chunk.min(buf.len()).min(self.response.len());
            buf[..n].copy_from_slice(&self.response[..n]);
            self.response = &self.response[n..];
            Ok(n)
        }
    }

    impl Write for MockSession {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        async fn flush(&mut self) -> Result<(), Self::Error> {
            self.flushed = true;
            Ok(())
        }
    }

    const ENDPOINT: FeedEndpoint<'static> = FeedEndpoint {
        host: "io.adafruit.com",
        username: "gardener",
        api_key: "aio_secret",
    };

    #[test]
    fn writes_adafruit_io_request() {
        let mut session = MockSession::new(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{}");
        let mut buf = [0u8; 128];

        let status = block_on(post_feed_value(
            &mut session,
            &ENDPOINT,
            "temperature",
            "21.5",
            &mut buf,
        ))
        .unwrap();

        assert_eq!(status, 200);
        assert!(session.flushed);
        assert_eq!(
            session.request(),
            "POST /api/v2/gardener/feeds/temperature/data HTTP/1.1\r\n\
             Host: io.adafruit.com\r\n\
             Content-Type: application/json\r\n\
             X-AIO-Key: aio_secret\r\n\
             Content-Length: 17\r\n\
             Connection: close\r\n\
             \r\n\
             {\"value\": \"21.5\"}"
        );
    }

    #[test]
    fn reports_rate_limiting() {
        let mut session = MockSession::new(b"HTTP/1.1 429 Too Many Requests\r\n\r\n");
        let mut buf = [0u8; 128];

        let status = block_on(post_feed_value(&mut session, &ENDPOINT, "humidity", "40.0", &mut buf));

        assert_eq!(status.unwrap(), 429);
    }

    #[test]
    fn status_line_survives_small_buffer() {
        let mut session = MockSession::new(
            b"HTTP/1.1 201 Created\r\nX-Long-Header: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\r\n\r\n",
        );
        let mut buf = [0u8; 32];

        let status = block_on(post_feed_value(&mut session, &ENDPOINT, "humidity", "40.0", &mut buf));

        assert_eq!(status.unwrap(), 201);
    }

    #[test]
    fn closed_connection_is_an_error() {
        let mut session = MockSession::new(b"");
        let mut buf = [0u8; 64];

        let status = block_on(post_feed_value(&mut session, &ENDPOINT, "humidity", "40.0", &mut buf));

        assert!(matches!(status, Err(Error::ConnectionClosed)));
    }

    #[test]
    fn parses_status_lines() {
        assert_eq!(parse_status_line(b"HTTP/1.1 200 OK\r\n"), Some(200));
        assert_eq!(parse_status_line(b"HTTP/1.0 503 Service Unavailable\r\n"), Some(503));
        assert_eq!(parse_status_line(b"HTTP/1.1 200 OK"), None);
        assert_eq!(parse_status_line(b"SSH-2.0-OpenSSH\r\n"), None);
        assert_eq!(parse_status_line(b"HTTP/1.1 abc\r\n"), None);
    }
}

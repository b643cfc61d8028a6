/// Current firmware version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Size of the heap in DRAM (internal memory)
pub const HEAP_SIZE: usize = 72 * 1024;

/// Size of the TCP socket receive buffer
pub const RX_BUFFER_SIZE: usize = 4096;
/// Size of the TCP socket transmit buffer
pub const TX_BUFFER_SIZE: usize = 4096;

/// TLS record buffer size (a full TLS 1.3 record plus overhead)
pub const TLS_BUFFER_MAX: usize = 16640;

/// Buffer holding the HTTP response head
pub const RESPONSE_BUFFER_SIZE: usize = 512;

/// Socket timeout for a single feed upload
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Upload attempts per feed
pub const UPLOAD_ATTEMPTS: u8 = 3;
/// Delay before retrying a feed after a non-200 response
pub const UPLOAD_RETRY_DELAY_MS: u32 = 2_000;
/// Delay before retrying a feed after HTTP 429
pub const RATE_LIMIT_BACKOFF_MS: u32 = 60_000;

/// Timeout for a single Wi-Fi connect attempt
pub const WIFI_CONNECT_TIMEOUT_SECS: u64 = 15;
/// Timeout waiting for an IPv4 configuration once associated
pub const WIFI_IP_TIMEOUT_SECS: u64 = 20;
/// Access points reported by the startup scan
pub const WIFI_SCAN_MAX: usize = 10;

/// Settle delay after a sensor or network fault before sleeping
pub const FAULT_SETTLE_DELAY_MS: u32 = 1_000;

/// Status LED on/off time while associating
pub const LED_BLINK_MS: u32 = 50;
/// Status LED flashes per association poll
pub const LED_BLINK_COUNT: u8 = 3;

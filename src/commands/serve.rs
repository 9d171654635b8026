//! HTTP responder for the flash image
//!
//! Serves `/flash.bin` as a binary download and a small index page with a
//! link to it on any other path. Only the request line is looked at.
//! Connections are handled one at a time, each closed after its response.
//! A client that sends no request line within [`REQUEST_TIMEOUT`] is dropped.
//!
//! The image is streamed with page reads. Every page write is checked and
//! the transfer stops at the first failed write, so a client that goes away
//! costs at most one more page read.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use norflash_core::{ParallelBus, ParallelFlash, MAX_PAGE_SIZE};
use thiserror::Error;

/// Path of the binary image
pub const FLASH_PATH: &str = "/flash.bin";

/// Longest request line read before giving up on the rest
const MAX_REQUEST_LINE: u64 = 2048;

/// How long a connection may take to deliver its request line
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Write buffer for the image body
const STREAM_BUFFER_SIZE: usize = 4096;

const INDEX_HTML: &str = "<!DOCTYPE html>\n\
<html>\n\
<head><title>norflash</title></head>\n\
<body>\n\
<h1>Parallel NOR flash</h1>\n\
<p><a href=\"/flash.bin\">Download flash.bin</a></p>\n\
</body>\n\
</html>\n";

/// Errors while answering one connection
#[derive(Debug, Error)]
pub enum ServeError {
    /// Reading the request or writing the headers failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Client stopped accepting data mid-image
    #[error("Client disconnected after {sent} of {total} bytes")]
    Disconnected {
        sent: u64,
        total: u64,
        #[source]
        source: io::Error,
    },

    /// The page reader rejected a burst
    #[error("Flash read failed: {0}")]
    Flash(#[from] norflash_core::Error),
}

/// What a connection was answered with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// The full image, in bytes
    Image(u64),
    /// The index page
    Index,
}

/// Request path from an HTTP request line, without any query string
///
/// Returns `None` for a line that has no path.
pub fn parse_request_line(line: &str) -> Option<&str> {
    let mut parts = line.split_whitespace();
    let _method = parts.next()?;
    let target = parts.next()?;
    Some(target.split(['?', '#']).next().unwrap_or(target))
}

/// Answer a single connection
pub fn handle_connection<B, S>(
    flash: &mut ParallelFlash<B>,
    stream: &mut S,
) -> Result<Served, ServeError>
where
    B: ParallelBus,
    S: Read + Write,
{
    let mut raw = Vec::new();
    {
        let mut reader = BufReader::new((&mut *stream).take(MAX_REQUEST_LINE));
        reader.read_until(b'\n', &mut raw)?;
    }
    let line = String::from_utf8_lossy(&raw);
    let path = parse_request_line(&line);
    log::debug!("Request line: {:?}", line.trim_end());

    if path == Some(FLASH_PATH) {
        let sent = stream_image(flash, stream)?;
        Ok(Served::Image(sent))
    } else {
        write!(
            stream,
            "HTTP/1.1 200 OK\r\n\
             Content-Type: text/html\r\n\
             Connection: close\r\n\
             Content-Length: {}\r\n\
             \r\n{}",
            INDEX_HTML.len(),
            INDEX_HTML
        )?;
        stream.flush()?;
        Ok(Served::Index)
    }
}

/// Write the headers and the whole device, one page read per window
fn stream_image<B, S>(flash: &mut ParallelFlash<B>, stream: &mut S) -> Result<u64, ServeError>
where
    B: ParallelBus,
    S: Write,
{
    let total = flash.size() as u64;
    let page_size = flash.page_size().min(MAX_PAGE_SIZE);

    write!(
        stream,
        "HTTP/1.1 200 OK\r\n\
         Content-Type: application/octet-stream\r\n\
         Connection: close\r\n\
         Content-Length: {}\r\n\
         \r\n",
        total
    )?;

    let mut out = BufWriter::with_capacity(STREAM_BUFFER_SIZE, stream);
    let mut page = [0u8; MAX_PAGE_SIZE];
    let mut sent = 0u64;

    while sent < total {
        let len = page_size.min((total - sent) as usize);
        let buf = &mut page[..len];
        flash.read_page_into(sent as u32, buf)?;

        out.write_all(buf)
            .map_err(|source| ServeError::Disconnected {
                sent,
                total,
                source,
            })?;
        sent += len as u64;
    }

    out.flush().map_err(|source| ServeError::Disconnected {
        sent,
        total,
        source,
    })?;
    Ok(sent)
}

/// Bound the time an accepted connection can stall the request read
fn prepare_stream(stream: &TcpStream) -> io::Result<()> {
    stream.set_read_timeout(Some(REQUEST_TIMEOUT))
}

/// Run the serve command until the listener fails
pub fn run_serve<B: ParallelBus>(
    flash: &mut ParallelFlash<B>,
    listen: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(listen)
        .map_err(|e| format!("Failed to listen on {}: {}", listen, e))?;

    log::info!(
        "Serving {} ({} bytes) on http://{}{}",
        flash.profile().name,
        flash.size(),
        listener.local_addr()?,
        FLASH_PATH
    );

    for stream in listener.incoming() {
        let mut stream = match stream {
            Ok(s) => s,
            Err(e) => {
                log::warn!("Failed to accept connection: {}", e);
                continue;
            }
        };
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown peer".to_string());

        if let Err(e) = prepare_stream(&stream) {
            log::warn!("{}: failed to set read timeout: {}", peer, e);
            continue;
        }

        match handle_connection(flash, &mut stream) {
            Ok(Served::Image(bytes)) => log::info!("{}: sent {} bytes", peer, bytes),
            Ok(Served::Index) => log::debug!("{}: sent index page", peer),
            Err(e) => log::warn!("{}: {}", peer, e),
        }
    }

    Ok(())
}

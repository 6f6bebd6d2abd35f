//! Viewer connection handling
//!
//! One connection is one subscriber. Requests are answered in order on the
//! same stream; change notifications are interleaved between replies as
//! they arrive.

use std::io;
use std::time::Duration;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
    BufWriter,
};

use crate::error::Result;
use crate::hub::Subscriber;
use crate::registry::RegistryError;
use crate::service::LineupService;

use super::config::ServerConfig;
use super::message::{Reply, Request};

/// A single viewer session
pub struct Connection<S> {
    session_id: u64,
    stream: S,
    service: LineupService,
    max_line_len: usize,
    write_timeout: Duration,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new connection
    pub fn new(session_id: u64, stream: S, service: LineupService, config: &ServerConfig) -> Self {
        Self {
            session_id,
            stream,
            service,
            max_line_len: config.max_line_len,
            write_timeout: config.write_timeout,
        }
    }

    /// Run the session until the viewer goes away
    ///
    /// The subscriber is registered on entry and unregistered on every exit
    /// path, including I/O errors and a viewer that stops reading.
    pub async fn run(self) -> Result<()> {
        let Connection {
            session_id,
            stream,
            service,
            max_line_len,
            write_timeout,
        } = self;

        let mut subscriber = service.connect()?;
        tracing::debug!(
            session_id = session_id,
            subscriber_id = %subscriber.id(),
            "Viewer connected"
        );

        let mut session = Session {
            service: &service,
            subscriber: &mut subscriber,
            max_line_len,
            write_timeout,
        };
        let result = session.serve(stream).await;
        service.disconnect(subscriber).await;

        tracing::debug!(session_id = session_id, "Viewer disconnected");
        result
    }
}

struct Session<'a> {
    service: &'a LineupService,
    subscriber: &'a mut Subscriber,
    max_line_len: usize,
    write_timeout: Duration,
}

impl Session<'_> {
    async fn serve<S>(&mut self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (reader, writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);
        let mut writer = BufWriter::new(writer);
        let mut line = Vec::with_capacity(256);

        loop {
            tokio::select! {
                read = read_bounded_line(&mut reader, &mut line, self.max_line_len) => {
                    if read? == 0 {
                        // The last request may arrive without a newline
                        if let Some(reply) = handle_line(self.service, &line).await {
                            self.send(&mut writer, &reply.encode()?).await?;
                        }
                        return Ok(());
                    }

                    if line.last() == Some(&b'\n') {
                        let reply = handle_line(self.service, &line).await;
                        line.clear();
                        if let Some(reply) = reply {
                            self.send(&mut writer, &reply.encode()?).await?;
                        }
                    } else if line.len() > self.max_line_len {
                        let err = RegistryError::Validation(format!(
                            "request line longer than {} bytes",
                            self.max_line_len
                        ));
                        self.send(&mut writer, &Reply::from(err).encode()?).await?;
                        return Ok(());
                    }
                }
                notification = self.subscriber.recv() => {
                    match notification {
                        Some(n) => self.send(&mut writer, &n.payload).await?,
                        // Removed by the hub; nothing more will arrive
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    /// Write one line, giving up if the viewer does not take it in time
    async fn send<W>(&self, writer: &mut W, line: &[u8]) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let write = async {
            writer.write_all(line).await?;
            writer.flush().await
        };

        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!(
                    subscriber_id = %self.subscriber.id(),
                    timeout_ms = self.write_timeout.as_millis() as u64,
                    "Viewer stopped reading, closing session"
                );
                Err(io::Error::new(io::ErrorKind::TimedOut, "viewer stopped reading").into())
            }
        }
    }
}

/// Read up to the next newline without buffering more than `max_line_len + 1` bytes
///
/// Cancel safe: bytes read before cancellation stay in `line`.
async fn read_bounded_line<R>(
    reader: &mut R,
    line: &mut Vec<u8>,
    max_line_len: usize,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let remaining = (max_line_len + 1).saturating_sub(line.len()) as u64;
    let read = reader.take(remaining).read_until(b'\n', line).await?;
    Ok(read)
}

async fn handle_line(service: &LineupService, line: &[u8]) -> Option<Reply> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return None;
    }

    let reply = match Request::decode(trimmed) {
        Ok(request) => service.dispatch(request).await,
        Err(e) => {
            tracing::debug!(error = %e, "Malformed request");
            Reply::error(&e)
        }
    };

    if let Reply::Error { kind, message } = &reply {
        tracing::debug!(kind = ?kind, message = %message, "Request failed");
    }

    Some(reply)
}

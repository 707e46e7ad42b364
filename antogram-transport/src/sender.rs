use crate::TransportError;
use antogram_config::{SenderConfig, WebSocketOptions};
use log::info;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Sends serialized data to a destination.
pub trait Sender {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub fn create_sender(config: &SenderConfig) -> Result<Box<dyn Sender>, TransportError> {
    Ok(match config {
        SenderConfig::Null => Box::new(NullSender),
        SenderConfig::Stdio => Box::new(StdioSender::new()),
        SenderConfig::File(options) => Box::new(FileSender::create(&options.output_path)?),
        SenderConfig::WebSocket(options) => websocket_sender(options)?,
    })
}

#[cfg(feature = "websocket")]
fn websocket_sender(options: &WebSocketOptions) -> Result<Box<dyn Sender>, TransportError> {
    let mut sender = crate::WebSocketSender::new(&options.host, options.port);
    sender.start()?;
    Ok(Box::new(sender))
}

#[cfg(not(feature = "websocket"))]
fn websocket_sender(options: &WebSocketOptions) -> Result<Box<dyn Sender>, TransportError> {
    Err(TransportError::WebSocket(format!(
        "cannot serve ws://{}:{}: built without the websocket feature",
        options.host, options.port
    )))
}

/// Writes each payload as a line on standard output.
pub struct StdioSender {
    stdout: io::Stdout,
}

impl StdioSender {
    pub fn new() -> Self {
        StdioSender { stdout: io::stdout() }
    }
}

impl Sender for StdioSender {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let mut out = self.stdout.lock();
        out.write_all(data)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}

impl Default for StdioSender {
    fn default() -> Self {
        Self::new()
    }
}

/// Appends each payload as a line to a file.
pub struct FileSender {
    writer: BufWriter<File>,
}

impl FileSender {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        info!("Writing frames to {}", path.display());
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }
}

impl Sender for FileSender {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.writer.write_all(data)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Discards everything; for headless runs that only record PNGs.
pub struct NullSender;

impl Sender for NullSender {
    fn send(&mut self, _data: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }
}

//! Frame output: serializers, senders and the PNG canvas.

pub mod canvas;
pub mod sender;
pub mod serializer;
#[cfg(feature = "websocket")]
mod websocket;

pub use canvas::{PixelCanvas, PngRecorder};
pub use sender::{create_sender, FileSender, NullSender, Sender, StdioSender};
pub use serializer::{create_serializer, BinarySerializer, JsonSerializer, Serializer};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketSender;

use antogram_config::TransportConfig;
use antogram_core::Canvas;
use antogram_simulation::FrameSnapshot;
use log::debug;
use std::io;
use thiserror::Error;

// --- Error Type ---

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary serialization failed: {0}")]
    Binary(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Image output failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("WebSocket error: {0}")]
    WebSocket(String),
}

// --- Controller ---

/// Serializes and sends every `frame_frequency`-th frame, and optionally
/// records PNG frames alongside.
pub struct TransportController {
    serializer: Box<dyn Serializer>,
    sender: Box<dyn Sender>,
    frame_frequency: u64,
    recorder: Option<PngRecorder>,
    frames_sent: u64,
}

impl TransportController {
    pub fn new(serializer: Box<dyn Serializer>, sender: Box<dyn Sender>, frame_frequency: u32) -> Self {
        Self {
            serializer,
            sender,
            frame_frequency: frame_frequency.max(1) as u64,
            recorder: None,
            frames_sent: 0,
        }
    }

    /// Builds serializer, sender and recorder from configuration.
    pub fn from_config(config: &TransportConfig, canvas: Canvas) -> Result<Self, TransportError> {
        let controller = Self::new(
            create_serializer(config.serializer),
            create_sender(&config.sender)?,
            config.frame_frequency,
        );
        Ok(match &config.png {
            Some(png) => controller.with_recorder(PngRecorder::new(&png.directory, png.frequency, canvas)?),
            None => controller,
        })
    }

    pub fn with_recorder(mut self, recorder: PngRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Sends `snapshot` if its frame is due. Returns whether it was sent.
    pub fn publish(&mut self, snapshot: &FrameSnapshot) -> Result<bool, TransportError> {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(snapshot)?;
        }
        if snapshot.frame % self.frame_frequency != 0 {
            return Ok(false);
        }
        self.send(snapshot)?;
        Ok(true)
    }

    /// Sends the last frame regardless of frequency and flushes outputs.
    pub fn finish(&mut self, snapshot: &FrameSnapshot) -> Result<(), TransportError> {
        self.send(snapshot)?;
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.save_final(snapshot)?;
        }
        self.sender.flush()?;
        debug!("Transport finished after {} frames", self.frames_sent);
        Ok(())
    }

    fn send(&mut self, snapshot: &FrameSnapshot) -> Result<(), TransportError> {
        let data = self.serializer.serialize(snapshot)?;
        self.sender.send(data.as_bytes())?;
        self.frames_sent += 1;
        Ok(())
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}

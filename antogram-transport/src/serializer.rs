use crate::TransportError;
use antogram_config::SerializerType;
use antogram_simulation::FrameSnapshot;

/// Serializes a frame into a text payload.
pub trait Serializer: Send + Sync {
    fn serialize(&self, frame: &FrameSnapshot) -> Result<String, TransportError>;
}

pub fn create_serializer(kind: SerializerType) -> Box<dyn Serializer> {
    match kind {
        SerializerType::Json => Box::new(JsonSerializer),
        SerializerType::Binary => Box::new(BinarySerializer),
    }
}

/// One JSON object per frame.
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, frame: &FrameSnapshot) -> Result<String, TransportError> {
        Ok(serde_json::to_string(frame)?)
    }
}

/// bincode-encoded frame, base64 wrapped so it travels as text.
pub struct BinarySerializer;

impl Serializer for BinarySerializer {
    fn serialize(&self, frame: &FrameSnapshot) -> Result<String, TransportError> {
        let buffer = bincode::serialize(frame)?;
        Ok(base64::encode(buffer))
    }
}

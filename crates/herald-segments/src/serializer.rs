//! Encoding of descriptors into announcement payloads.

use thiserror::Error;

use crate::descriptor::{DataSegment, ServerMetadata};

/// A descriptor could not be encoded.
#[derive(Debug, Error)]
#[error("failed to serialise {descriptor} descriptor")]
pub struct SerializationError {
    descriptor: &'static str,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl SerializationError {
    /// Wraps the encoder's failure for the named kind of descriptor.
    #[must_use]
    pub fn new(
        descriptor: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            descriptor,
            source: source.into(),
        }
    }

    /// Kind of descriptor that failed, `server` or `segment`.
    #[must_use]
    pub const fn descriptor(&self) -> &'static str {
        self.descriptor
    }
}

/// Turns descriptors into the bytes stored in announced nodes.
pub trait DescriptorSerializer: Send + Sync {
    /// Encodes the server's self-descriptor.
    fn server_bytes(&self, server: &ServerMetadata) -> Result<Vec<u8>, SerializationError>;

    /// Encodes a served segment's descriptor.
    fn segment_bytes(&self, segment: &DataSegment) -> Result<Vec<u8>, SerializationError>;
}

/// Encodes descriptors as compact JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDescriptorSerializer;

impl DescriptorSerializer for JsonDescriptorSerializer {
    fn server_bytes(&self, server: &ServerMetadata) -> Result<Vec<u8>, SerializationError> {
        serde_json::to_vec(server).map_err(|error| SerializationError::new("server", error))
    }

    fn segment_bytes(&self, segment: &DataSegment) -> Result<Vec<u8>, SerializationError> {
        serde_json::to_vec(segment).map_err(|error| SerializationError::new("segment", error))
    }
}

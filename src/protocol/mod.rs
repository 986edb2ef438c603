// ABOUTME: Wire protocol module for aircast
// ABOUTME: Control messages (JSON) and binary audio batch framing

/// Binary framing for audio-frame batches
pub mod batch;
/// Control message type definitions and serialization
pub mod messages;

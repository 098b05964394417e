//! Outbound message delivery.

pub mod sink;
pub mod whatsapp;

pub use sink::{ButtonChoice, MessageSink, OutboundMessage};
pub use whatsapp::WhatsAppChannel;

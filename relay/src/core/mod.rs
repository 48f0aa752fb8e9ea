//! Relay core: frame codec, link seam, agent client, notifier and session.

pub mod codec;
pub mod elevenlabs;
pub mod link;
pub mod notifier;
pub mod session;

pub use codec::{AudioChunk, CodecError, InboundEvent, Origin, OutboundEvent};
pub use elevenlabs::{ElevenLabsConfig, ElevenLabsConnector};
pub use link::{LinkEvent, LinkSide, MediaLink, OutboundConnector};
pub use notifier::{NotificationEvent, NotifyDispatch, TranscriptNotifier};
pub use session::{Session, SessionState, run_session};

//! UseCase layer: application services for the signaling relay.

pub mod disconnect;
pub mod error;
pub mod join_live;
pub mod live_chat;
pub mod signaling;

pub use disconnect::DisconnectConnectionUseCase;
pub use error::ChatError;
pub use join_live::JoinLiveUseCase;
pub use live_chat::SendChatMessageUseCase;
pub use signaling::SignalingRelayUseCase;

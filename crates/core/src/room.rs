use anyhow::Result;
use async_trait::async_trait;

/// The transport that hosts a learner's session.
///
/// Failures here are fatal to the session and are never retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomTransport: Send + Sync {
    /// The identifier of the room this session runs in.
    fn room_name(&self) -> String;

    async fn connect(&self) -> Result<()>;

    /// Tears the room down, disconnecting the learner.
    async fn delete_room(&self, room: &str) -> Result<()>;
}

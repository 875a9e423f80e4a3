use anyhow::Result;
use async_trait::async_trait;
use englishly_core::room::RoomTransport;
use tracing::info;

/// A room that exists only for the lifetime of a local console session.
pub struct LocalRoom {
    name: String,
}

impl LocalRoom {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl RoomTransport for LocalRoom {
    fn room_name(&self) -> String {
        self.name.clone()
    }

    async fn connect(&self) -> Result<()> {
        info!(room = %self.name, "Learner joined local room");
        Ok(())
    }

    async fn delete_room(&self, room: &str) -> Result<()> {
        info!(%room, "Local room closed");
        Ok(())
    }
}

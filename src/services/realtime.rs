// src/services/realtime.rs

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;

use crate::models::{
    chat::Message,
    locations::UserLocation,
    ride_requests::RideRequest,
    rides::Ride,
};

const CHANNEL_CAPACITY: usize = 64;

// O que muda numa carona. Cada evento leva a linha alterada inteira.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum RideEvent {
    RideStarted(Ride),
    RequestCreated(RideRequest),
    RequestDecided(RideRequest),
    LocationUpdated(UserLocation),
    MessagePosted(Message),
}

/// Um canal broadcast por carona, criado na primeira inscrição e
/// removido quando o último inscrito sai.
#[derive(Debug, Default)]
pub struct RealtimeHub {
    channels: DashMap<i64, broadcast::Sender<RideEvent>>,
}

impl RealtimeHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribe(self: &Arc<Self>, ride_id: i64) -> RideSubscription {
        let receiver = self
            .channels
            .entry(ride_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();

        RideSubscription { ride_id, receiver: Some(receiver), hub: Arc::clone(self) }
    }

    /// Sem inscritos, não faz nada.
    pub fn publish(&self, ride_id: i64, event: RideEvent) {
        let Some(sender) = self.channels.get(&ride_id).map(|s| s.clone()) else {
            return;
        };

        if sender.send(event).is_err() {
            // Todos os receptores já caíram
            self.release(ride_id);
        }
    }

    pub fn subscriber_count(&self, ride_id: i64) -> usize {
        self.channels.get(&ride_id).map(|s| s.receiver_count()).unwrap_or(0)
    }

    pub fn active_channels(&self) -> usize {
        self.channels.len()
    }

    fn release(&self, ride_id: i64) {
        self.channels.remove_if(&ride_id, |_, sender| sender.receiver_count() == 0);
    }
}

/// Inscrição num canal de carona. Ao cair (drop), libera o canal se ficou vazio.
pub struct RideSubscription {
    ride_id: i64,
    receiver: Option<broadcast::Receiver<RideEvent>>,
    hub: Arc<RealtimeHub>,
}

impl RideSubscription {
    pub fn ride_id(&self) -> i64 {
        self.ride_id
    }

    pub async fn recv(&mut self) -> Result<RideEvent, broadcast::error::RecvError> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.recv().await,
            None => Err(broadcast::error::RecvError::Closed),
        }
    }
}

impl Drop for RideSubscription {
    fn drop(&mut self) {
        // Solta o receptor antes de conferir a contagem
        self.receiver.take();
        self.hub.release(self.ride_id);
    }
}

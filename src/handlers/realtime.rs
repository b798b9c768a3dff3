// src/handlers/realtime.rs

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        i18n::I18nStore,
    },
    config::AppState,
    middleware::{auth::WS_BEARER_PROTOCOL, i18n::Locale, tenancy::TenantContext},
    models::{
        chat::Message,
        locations::{PositionErrorReason, ShareLocationPayload, UserLocation},
        ride_requests::{decision_notice, role_of, RenderedNotice},
        rides::Ride,
    },
    services::{location_service::LiveLocationView, realtime::RideEvent},
};

// ---
// Frames do servidor (mesmo formato "type"/"payload" dos RideEvent)
// ---
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
enum ServerFrame<'a> {
    Snapshot {
        ride: &'a Ride,
        locations: Vec<&'a UserLocation>,
        messages: Vec<Message>,
    },
    Notice(RenderedNotice),
}

// ---
// Frames do cliente
// ---
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
enum ClientFrame {
    Position(ShareLocationPayload),
    PositionError { reason: PositionErrorReason },
    Chat { content: String },
}

// Motivo do fim da sessão (só para o log)
#[derive(Debug)]
enum SessionEnd {
    ClientClosed,
    ChannelClosed,
    Network(axum::Error),
}

#[utoipa::path(
    get,
    path = "/api/rides/{id}/feed",
    tag = "Live Location",
    params(
        ("id" = i64, Path, description = "ID da carona"),
        ("token" = Option<String>, Query, description = "JWT, só quando o cliente não manda Authorization")
    ),
    responses(
        (status = 101, description = "WebSocket: snapshot, depois eventos da carona. No navegador o token vai em `Sec-WebSocket-Protocol: bearer, <token>` ou em `?token=`"),
        (status = 404, description = "Carona não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn ride_feed(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: TenantContext,
    Path(ride_id): Path<i64>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    // A carona precisa existir na organização antes do upgrade
    let ride = app_state
        .ride_service
        .get_ride(&ctx.scope(), ride_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    // Ecoa o subprotocolo quando o token veio por ele (navegador)
    Ok(ws.protocols([WS_BEARER_PROTOCOL]).on_upgrade(move |socket| async move {
        let session = FeedSession { app_state, locale, ctx, ride };
        session.run(socket).await;
    }))
}

struct FeedSession {
    app_state: AppState,
    locale: Locale,
    ctx: TenantContext,
    ride: Ride,
}

impl FeedSession {
    async fn run(self, mut socket: WebSocket) {
        let scope = self.ctx.scope();
        let ride_id = self.ride.id;

        // Inscreve antes do snapshot para não perder o que chegar no meio
        let mut subscription = self.app_state.hub.subscribe(ride_id);

        let (mut view, messages, failure) = snapshot_or_empty(self.ctx.user.id, self.load_snapshot().await);
        if let Some(e) = failure {
            // Não é fatal: o feed segue com snapshot vazio e os eventos novos
            tracing::error!("Falha ao carregar snapshot da carona {}: {:?}", ride_id, e);
            let notice = self.error_notice("notice_feed_unavailable", &e);
            if self.send_notice(&mut socket, notice).await.is_err() {
                return;
            }
        }

        let frame = ServerFrame::Snapshot { ride: &self.ride, locations: view.markers(), messages };
        if let Err(e) = send_json(&mut socket, &frame).await {
            tracing::debug!("Feed {} encerrado antes do snapshot: {}", ride_id, e);
            return;
        }

        tracing::info!(
            "Usuário {} conectado ao feed da carona {} ({} inscritos)",
            scope.user_id,
            subscription.ride_id(),
            self.app_state.hub.subscriber_count(ride_id)
        );

        let end = loop {
            let step = tokio::select! {
                event = subscription.recv() => {
                    self.handle_event(&mut socket, &mut view, event).await
                }
                incoming = socket.recv() => {
                    self.handle_incoming(&mut socket, &mut view, incoming).await
                }
            };
            if let Err(end) = step {
                break end;
            }
        };

        tracing::info!("Feed da carona {} encerrado para {}: {:?}", ride_id, scope.user_id, end);
        drop(subscription);
    }

    async fn load_snapshot(&self) -> Result<(LiveLocationView, Vec<Message>), AppError> {
        let scope = self.ctx.scope();
        let locations = self.app_state.location_service.list_locations(&scope, self.ride.id).await?;
        let messages = self.app_state.chat_service.list_messages(&scope, self.ride.id).await?;
        Ok((LiveLocationView::new(self.ctx.user.id, locations), messages))
    }

    async fn handle_event(
        &self,
        socket: &mut WebSocket,
        view: &mut LiveLocationView,
        event: Result<RideEvent, RecvError>,
    ) -> Result<(), SessionEnd> {
        let event = match event {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Feed da carona {} atrasado, {} eventos perdidos", self.ride.id, skipped);
                let notice = RenderedNotice {
                    title: self.translate("notice_feed_lagged"),
                    description: String::new(),
                };
                return self.send_notice(socket, notice).await;
            }
            Err(RecvError::Closed) => return Err(SessionEnd::ChannelClosed),
        };

        if let RideEvent::LocationUpdated(location) = &event {
            view.apply(location.clone());
        }
        send_json(socket, &event).await.map_err(SessionEnd::Network)?;

        // Aviso da decisão só para os dois lados do pedido
        if let RideEvent::RequestDecided(request) = &event {
            let user_id = self.ctx.user.id;
            if user_id == request.requester_id || self.ride.is_driver(user_id) {
                let notice = decision_notice(request, role_of(user_id, request), &self.locale.0, self.i18n());
                self.send_notice(socket, notice).await?;
            }
        }
        Ok(())
    }

    async fn handle_incoming(
        &self,
        socket: &mut WebSocket,
        view: &mut LiveLocationView,
        incoming: Option<Result<WsMessage, axum::Error>>,
    ) -> Result<(), SessionEnd> {
        let message = match incoming {
            None | Some(Ok(WsMessage::Close(_))) => return Err(SessionEnd::ClientClosed),
            Some(Err(e)) => return Err(SessionEnd::Network(e)),
            Some(Ok(message)) => message,
        };

        let WsMessage::Text(text) = message else {
            // Ping/Pong o axum responde sozinho; binário é ignorado
            return Ok(());
        };

        match serde_json::from_str::<ClientFrame>(text.as_str()) {
            Ok(frame) => self.handle_frame(socket, view, frame).await,
            Err(e) => {
                tracing::warn!("Frame inválido no feed {}: {}", self.ride.id, e);
                let notice = RenderedNotice {
                    title: self.translate("notice_invalid_frame"),
                    description: String::new(),
                };
                self.send_notice(socket, notice).await
            }
        }
    }

    async fn handle_frame(
        &self,
        socket: &mut WebSocket,
        view: &mut LiveLocationView,
        frame: ClientFrame,
    ) -> Result<(), SessionEnd> {
        let scope = self.ctx.scope();
        match frame {
            ClientFrame::Position(payload) => {
                let result = match payload.validate() {
                    Ok(()) => {
                        self.app_state
                            .location_service
                            .share_location(&scope, self.ride.id, payload)
                            .await
                    }
                    Err(e) => Err(AppError::ValidationError(e)),
                };
                match result {
                    Ok(location) => {
                        if !view.is_tracking() {
                            tracing::info!("Rastreamento religado para {}", scope.user_id);
                            view.resume_tracking();
                        }
                        view.apply(location);
                        Ok(())
                    }
                    Err(e) => {
                        let notice = self.error_notice("notice_location_update_failed", &e);
                        self.send_notice(socket, notice).await
                    }
                }
            }
            ClientFrame::PositionError { reason } => {
                let notice = view.position_failed(reason, &self.locale.0, self.i18n());
                self.send_notice(socket, notice).await
            }
            ClientFrame::Chat { content } => {
                let result = self
                    .app_state
                    .chat_service
                    .send_message(&scope, self.ctx.display_name(), self.ride.id, &content)
                    .await;
                match result {
                    // A própria mensagem volta pelo broadcast
                    Ok(_) => Ok(()),
                    Err(e) => {
                        let notice = self.error_notice("notice_message_failed", &e);
                        self.send_notice(socket, notice).await
                    }
                }
            }
        }
    }

    fn i18n(&self) -> &I18nStore {
        &self.app_state.i18n_store
    }

    fn translate(&self, key: &str) -> String {
        self.i18n().translate(&self.locale.0, key, &[])
    }

    fn error_notice(&self, title_key: &str, error: &AppError) -> RenderedNotice {
        RenderedNotice {
            title: self.translate(title_key),
            description: error.to_api_error(&self.locale, self.i18n()).error,
        }
    }

    async fn send_notice(&self, socket: &mut WebSocket, notice: RenderedNotice) -> Result<(), SessionEnd> {
        send_json(socket, &ServerFrame::Notice(notice)).await.map_err(SessionEnd::Network)
    }
}

fn snapshot_or_empty(
    user_id: Uuid,
    snapshot: Result<(LiveLocationView, Vec<Message>), AppError>,
) -> (LiveLocationView, Vec<Message>, Option<AppError>) {
    match snapshot {
        Ok((view, messages)) => (view, messages, None),
        Err(e) => (LiveLocationView::new(user_id, Vec::new()), Vec::new(), Some(e)),
    }
}

async fn send_json<T: Serialize>(socket: &mut WebSocket, payload: &T) -> Result<(), axum::Error> {
    match serde_json::to_string(payload) {
        Ok(body) => socket.send(WsMessage::Text(body.into())).await,
        Err(e) => {
            // Não derruba a conexão por um frame
            tracing::error!("Falha ao serializar frame do feed: {}", e);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"type":"position","payload":{"latitude":-23.5,"longitude":-46.6}}"#)]
    #[case(r#"{"type":"positionError","payload":{"reason":"permission_denied"}}"#)]
    #[case(r#"{"type":"chat","payload":{"content":"Chego em 5 min"}}"#)]
    fn client_frames_parse(#[case] raw: &str) {
        assert!(serde_json::from_str::<ClientFrame>(raw).is_ok());
    }

    #[rstest]
    #[case(r#"{"type":"teleport","payload":{}}"#)]
    #[case(r#"{"type":"chat"}"#)]
    #[case("not json")]
    fn unknown_client_frames_are_rejected(#[case] raw: &str) {
        assert!(serde_json::from_str::<ClientFrame>(raw).is_err());
    }

    #[test]
    fn notice_frame_shape() {
        let frame = ServerFrame::Notice(RenderedNotice { title: "t".into(), description: "d".into() });
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "notice");
        assert_eq!(json["payload"]["title"], "t");
    }

    #[test]
    fn failed_snapshot_keeps_the_session_with_empty_state() {
        let user_id = Uuid::new_v4();
        let (view, messages, failure) =
            snapshot_or_empty(user_id, Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut)));

        assert!(matches!(failure, Some(AppError::DatabaseError(_))));
        assert!(messages.is_empty());
        assert!(view.markers().is_empty());
        assert!(view.is_tracking());

        let ride = Ride {
            id: 7,
            tenant_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            driver_name: "Ana".into(),
            from_location: "Downtown Office".into(),
            to_location: "Tech Park".into(),
            from_latitude: None,
            from_longitude: None,
            to_latitude: None,
            to_longitude: None,
            distance: None,
            departure_date: chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            departure_time: chrono::NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            seats_available: 2,
            ride_status: crate::models::rides::RideStatus::Pending,
            is_recurring: false,
            recurring_days: vec![],
            recurring_until: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let frame = ServerFrame::Snapshot { ride: &ride, locations: view.markers(), messages };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "snapshot");
        assert_eq!(json["payload"]["locations"], serde_json::json!([]));
        assert_eq!(json["payload"]["messages"], serde_json::json!([]));
    }

    #[test]
    fn loaded_snapshot_passes_through() {
        let user_id = Uuid::new_v4();
        let view = LiveLocationView::new(user_id, Vec::new());
        let (_, _, failure) = snapshot_or_empty(user_id, Ok((view, Vec::new())));
        assert!(failure.is_none());
    }

    #[test]
    fn position_error_reason_maps_to_notice() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"positionError","payload":{"reason":"timeout"}}"#).unwrap();
        match frame {
            ClientFrame::PositionError { reason } => assert_eq!(reason, PositionErrorReason::Timeout),
            other => panic!("frame inesperado: {:?}", other),
        }
    }
}

use std::sync::Arc;

use actix::prelude::SendError;
use actix::{Actor, ActorContext, AsyncContext, Handler, Message, Running, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;

use system::destination::{route, Route};
use system::{ClientFrame, ConnectionId, Payload, Point, Publisher, ServerFrame};

use crate::broker::{BrokerCommand, BrokerTx};
use crate::Accumulator;

/// Broker events buffered per connection before further ones are dropped.
pub const CONNECTION_QUEUE_SIZE: usize = 256;

#[derive(Debug)]
pub enum ConnectionEvent {
    Connected { connection_id: ConnectionId },
    Frame(ServerFrame),
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionActorMessage(ConnectionEvent);

enum ConnectionState {
    Idle,
    Connected(ConnectionId),
}

struct ConnectionActor {
    state: ConnectionState,
    broker_tx: BrokerTx,
    accumulator: Arc<Accumulator>,
}

impl ConnectionActor {
    fn handle_frame(&self, frame: ClientFrame, from: ConnectionId) -> Result<(), String> {
        match frame {
            ClientFrame::Subscribe { destination } => self
                .broker_tx
                .send(BrokerCommand::Subscribe { from, destination })
                .map_err(|err| err.to_string()),
            ClientFrame::Unsubscribe { destination } => self
                .broker_tx
                .send(BrokerCommand::Unsubscribe { from, destination })
                .map_err(|err| err.to_string()),
            ClientFrame::Send { destination, body } => match route(&destination) {
                Some(Route::NewPoint(session_id)) => {
                    let point = serde_json::from_value::<Point>(body)
                        .map_err(|err| format!("invalid point for {}: {}", destination, err))?;
                    self.accumulator
                        .handle_point(session_id, point)
                        .map_err(|err| {
                            log::error!("Point handling failed: {}", err);
                            err.to_string()
                        })
                }
                Some(Route::Topic(topic)) => self
                    .broker_tx
                    .publish(topic, Payload::Raw(body))
                    .map_err(|err| err.to_string()),
                None => Err(format!("unknown destination {}", destination)),
            },
        }
    }

    fn send_frame(frame: &ServerFrame, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::to_string(frame) {
            Ok(text) => ctx.text(text),
            Err(err) => log::error!("Failed to encode {:?}: {}", frame, err),
        }
    }

    fn reject(message: String, ctx: &mut ws::WebsocketContext<Self>) {
        log::warn!("Rejected frame: {}", message);
        Self::send_frame(&ServerFrame::Error { message }, ctx);
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, rx) = tokio::sync::mpsc::channel::<ConnectionEvent>(CONNECTION_QUEUE_SIZE);

        if self.broker_tx.send(BrokerCommand::Connect { tx }).is_err() {
            log::error!("Broker is gone; closing connection");
            ctx.stop();
            return;
        }

        let addr = ctx.address().recipient::<ConnectionActorMessage>();

        actix::spawn(forward_events(
            rx,
            self.broker_tx.clone(),
            move |event| match addr.try_send(ConnectionActorMessage(event)) {
                Ok(()) => true,
                Err(SendError::Full(msg)) => {
                    addr.do_send(msg);
                    true
                }
                Err(SendError::Closed(_)) => false,
            },
        ));
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        if let ConnectionState::Connected(id) = self.state {
            if let Err(err) = self.broker_tx.send(BrokerCommand::Disconnect { from: id }) {
                log::debug!("Can't unregister connection {}: {}", id, err);
            }
        }

        Running::Stop
    }
}

/// Hands broker events to the connection actor until either side goes away.
///
/// `deliver` returns `false` once the actor has stopped. If that happens after
/// the broker registered the connection, the connection is unregistered here,
/// since the actor may have stopped before it learned its id.
async fn forward_events<F>(
    mut rx: tokio::sync::mpsc::Receiver<ConnectionEvent>,
    broker_tx: BrokerTx,
    mut deliver: F,
) where
    F: FnMut(ConnectionEvent) -> bool,
{
    log::debug!("connection forwarder - started");
    let mut registered = None;
    while let Some(event) = rx.recv().await {
        if let ConnectionEvent::Connected { connection_id } = &event {
            registered = Some(*connection_id);
        }
        if !deliver(event) {
            if let Some(id) = registered {
                if let Err(err) = broker_tx.send(BrokerCommand::Disconnect { from: id }) {
                    log::debug!("Can't unregister connection {}: {}", id, err);
                }
            }
            break;
        }
    }
    log::debug!("connection forwarder - terminated");
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Text(text)) => {
                let from = match self.state {
                    ConnectionState::Connected(from) => from,
                    ConnectionState::Idle => {
                        Self::reject("connection is not registered yet".into(), ctx);
                        return;
                    }
                };
                match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => {
                        log::debug!("Ingress {:?}", frame);
                        if let Err(message) = self.handle_frame(frame, from) {
                            Self::reject(message, ctx);
                        }
                    }
                    Err(err) => Self::reject(format!("malformed frame: {}", err), ctx),
                }
            }
            Ok(ws::Message::Binary(_)) => {
                Self::reject("binary frames are not supported".into(), ctx);
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(err) => {
                log::warn!("WebSocket protocol error: {}", err);
                ctx.stop();
            }
            _ => (),
        }
    }
}

/// Egress
impl Handler<ConnectionActorMessage> for ConnectionActor {
    type Result = ();

    fn handle(
        &mut self,
        msg: ConnectionActorMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> Self::Result {
        match msg.0 {
            ConnectionEvent::Connected { connection_id } => {
                self.state = ConnectionState::Connected(connection_id);
                Self::send_frame(&ServerFrame::Connected { connection_id }, ctx);
            }
            ConnectionEvent::Frame(frame) => Self::send_frame(&frame, ctx),
        }
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    broker_tx: web::Data<BrokerTx>,
    accumulator: web::Data<Accumulator>,
) -> Result<HttpResponse, Error> {
    ws::start(
        ConnectionActor {
            state: ConnectionState::Idle,
            broker_tx: broker_tx.get_ref().clone(),
            accumulator: accumulator.into_inner(),
        },
        &req,
        stream,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use system::AccumulatorConfig;
    use tokio::sync::mpsc::{channel, UnboundedReceiver};

    fn actor() -> (ConnectionActor, UnboundedReceiver<BrokerCommand>) {
        let (broker_tx, commands) = BrokerTx::detached();
        let accumulator = Arc::new(Accumulator::new(
            AccumulatorConfig::default(),
            broker_tx.clone(),
        ));
        let actor = ConnectionActor {
            state: ConnectionState::Connected(1),
            broker_tx,
            accumulator,
        };
        (actor, commands)
    }

    fn send(destination: &str, body: serde_json::Value) -> ClientFrame {
        ClientFrame::Send {
            destination: destination.into(),
            body,
        }
    }

    #[test]
    fn it_should_hand_new_point_to_accumulator() {
        let (actor, mut commands) = actor();

        actor
            .handle_frame(send("/app/newpoint.s1", serde_json::json!({ "x": 3, "y": 4 })), 1)
            .expect("");

        assert_eq!(actor.accumulator.point_count("s1"), 1);
        match commands.try_recv() {
            Ok(BrokerCommand::Publish {
                destination,
                payload,
            }) => {
                assert_eq!(destination, "/topic/newpoint.s1");
                assert_eq!(payload, Payload::Point(Point::new(3, 4)));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn it_should_reject_invalid_point_body() {
        let (actor, mut commands) = actor();

        let result = actor.handle_frame(
            send("/app/newpoint.s1", serde_json::json!({ "x": "left" })),
            1,
        );

        assert!(result.is_err());
        assert_eq!(actor.accumulator.point_count("s1"), 0);
        assert!(commands.try_recv().is_err());
    }

    #[test]
    fn it_should_reject_unknown_destination() {
        let (actor, _commands) = actor();

        let result = actor.handle_frame(send("/queue/anything", serde_json::json!({})), 1);

        assert!(result.expect_err("").contains("/queue/anything"));
    }

    #[test]
    fn it_should_report_failed_point_handling() {
        let (actor, commands) = actor();
        drop(commands);

        let result = actor.handle_frame(
            send("/app/newpoint.s1", serde_json::json!({ "x": 1, "y": 1 })),
            1,
        );

        assert!(result.is_err());
        assert_eq!(actor.accumulator.point_count("s1"), 0);
    }

    #[test]
    fn it_should_relay_topic_sends_as_raw_payload() {
        let (actor, mut commands) = actor();

        actor
            .handle_frame(send("/topic/chat", serde_json::json!({ "text": "hi" })), 1)
            .expect("");

        match commands.try_recv() {
            Ok(BrokerCommand::Publish {
                destination,
                payload,
            }) => {
                assert_eq!(destination, "/topic/chat");
                assert_eq!(payload, Payload::Raw(serde_json::json!({ "text": "hi" })));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn it_should_forward_subscriptions_with_connection_id() {
        let (actor, mut commands) = actor();

        actor
            .handle_frame(
                ClientFrame::Subscribe {
                    destination: "/topic/newpolygon.s1".into(),
                },
                7,
            )
            .expect("");

        match commands.try_recv() {
            Ok(BrokerCommand::Subscribe { from, destination }) => {
                assert_eq!(from, 7);
                assert_eq!(destination, "/topic/newpolygon.s1");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test]
    async fn it_should_unregister_when_actor_stopped_before_registration() {
        let (broker_tx, mut commands) = BrokerTx::detached();
        let (tx, rx) = channel(4);
        tx.send(ConnectionEvent::Connected { connection_id: 9 })
            .await
            .expect("");

        forward_events(rx, broker_tx, |_| false).await;

        match commands.try_recv() {
            Ok(BrokerCommand::Disconnect { from }) => assert_eq!(from, 9),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test]
    async fn it_should_keep_forwarding_while_actor_is_alive() {
        let (broker_tx, mut commands) = BrokerTx::detached();
        let (tx, rx) = channel(4);
        tx.send(ConnectionEvent::Connected { connection_id: 2 })
            .await
            .expect("");
        tx.send(ConnectionEvent::Frame(ServerFrame::Error {
            message: "x".into(),
        }))
        .await
        .expect("");
        drop(tx);

        let mut delivered = 0;
        forward_events(rx, broker_tx, |_| {
            delivered += 1;
            true
        })
        .await;

        assert_eq!(delivered, 2);
        assert!(commands.try_recv().is_err());
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use log::{error, info, warn};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::auth::CredentialProvider;

use super::model::{ClientFrame, ServerEvent};
use super::session::{Effect, Session, Status};
use super::url::socket_url;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const EVENT_CAPACITY: usize = 256;
const COMMAND_CAPACITY: usize = 64;

enum Command {
    Send {
        frame: ClientFrame,
        done: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// The one live socket per mounted chat view.
///
/// A background task owns the stream; the thread list and the open
/// conversation both subscribe to the same broadcast of parsed events.
/// Abnormal closures reconnect automatically per [`Session`]; once the
/// retry budget is exhausted, only dropping this handle and connecting a
/// fresh one recovers.
pub struct Connection {
    cmd_tx: mpsc::Sender<Command>,
    events: broadcast::Sender<ServerEvent>,
    status_rx: watch::Receiver<Status>,
    connected: Arc<AtomicBool>,
}

impl Connection {
    /// Spawn the connection task. The socket URL is rebuilt with a fresh
    /// token before every attempt; a missing token logs a warning and the
    /// connection is still attempted.
    pub fn connect(api_base: Url, credentials: CredentialProvider) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (status_tx, status_rx) = watch::channel(Status::Connecting);
        let connected = Arc::new(AtomicBool::new(false));

        tokio::spawn(connection_task(
            cmd_rx,
            api_base,
            credentials,
            events.clone(),
            status_tx,
            Arc::clone(&connected),
        ));

        Self {
            cmd_tx,
            events,
            status_rx,
            connected,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> watch::Receiver<Status> {
        self.status_rx.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Hand a frame to the open socket. Returns `false` without side
    /// effects when the socket is not open; callers must not assume
    /// delivery either way.
    pub async fn send(&self, frame: ClientFrame) -> bool {
        if !self.is_connected() {
            warn!("chat socket is not open, dropping outbound frame");
            return false;
        }

        let (done, confirmed) = oneshot::channel();
        if self
            .cmd_tx
            .send(Command::Send { frame, done })
            .await
            .is_err()
        {
            return false;
        }

        confirmed.await.unwrap_or(false)
    }

    /// Close with the normal-closure code and cancel any pending
    /// reconnect. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        let _ = self.cmd_tx.send(Command::Shutdown).await;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.cmd_tx.try_send(Command::Shutdown);
    }
}

enum Establish {
    Open(Socket),
    Failed(tokio_tungstenite::tungstenite::Error),
    Shutdown,
}

enum OpenEnd {
    Shutdown,
    Closed(Option<u16>),
}

async fn connection_task(
    mut cmd_rx: mpsc::Receiver<Command>,
    api_base: Url,
    credentials: CredentialProvider,
    events: broadcast::Sender<ServerEvent>,
    status_tx: watch::Sender<Status>,
    connected: Arc<AtomicBool>,
) {
    let mut session = Session::new();
    session.connect_requested();

    loop {
        let _ = status_tx.send(session.status());

        let token = credentials.bearer_token();
        if token.is_none() {
            warn!("no usable auth token found, connecting unauthenticated");
        }
        let url = match socket_url(&api_base, token.as_deref()) {
            Ok(url) => url,
            Err(e) => {
                error!("cannot derive chat socket URL: {e}");
                let _ = status_tx.send(Status::Error);
                break;
            }
        };

        match establish(url, &mut cmd_rx).await {
            Establish::Shutdown => {
                session.disconnected();
                let _ = status_tx.send(session.status());
                return;
            }
            Establish::Failed(e) => {
                warn!("chat socket connect failed: {e}");
                let _ = status_tx.send(Status::Error);
                let _ = events.send(ServerEvent::Error {
                    message: e.to_string(),
                });

                match session.on_close(None) {
                    Effect::Retry(delay) => {
                        if wait_retry(delay, &mut cmd_rx).await {
                            session.disconnected();
                            let _ = status_tx.send(session.status());
                            return;
                        }
                    }
                    Effect::GiveUp | Effect::None => {
                        error!(
                            "giving up on the chat socket after {} attempts; refresh to reconnect",
                            session.attempts()
                        );
                        let _ = status_tx.send(session.status());
                        break;
                    }
                }
            }
            Establish::Open(mut ws) => {
                session.on_open();
                connected.store(true, Ordering::SeqCst);
                let _ = status_tx.send(Status::Connected);
                info!("chat socket connected");

                let end = run_open(&mut ws, &mut cmd_rx, &events, &status_tx).await;
                connected.store(false, Ordering::SeqCst);

                match end {
                    OpenEnd::Shutdown => {
                        let close = CloseFrame {
                            code: CloseCode::Normal,
                            reason: "client disconnect".into(),
                        };
                        let _ = ws.close(Some(close)).await;
                        session.disconnected();
                        let _ = status_tx.send(session.status());
                        return;
                    }
                    OpenEnd::Closed(code) => match session.on_close(code) {
                        Effect::None => {
                            info!("chat socket closed normally");
                            let _ = status_tx.send(session.status());
                            break;
                        }
                        Effect::Retry(delay) => {
                            info!(
                                "chat socket closed (code {code:?}), reconnect attempt {} in {delay:?}",
                                session.attempts()
                            );
                            let _ = status_tx.send(session.status());
                            if wait_retry(delay, &mut cmd_rx).await {
                                session.disconnected();
                                let _ = status_tx.send(session.status());
                                return;
                            }
                        }
                        Effect::GiveUp => {
                            error!(
                                "chat socket closed and the retry budget is exhausted; refresh to reconnect"
                            );
                            let _ = status_tx.send(session.status());
                            break;
                        }
                    },
                }
            }
        }
    }

    // Terminal state: keep answering commands so send() resolves to false
    // instead of hanging on a dead channel.
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            Command::Send { done, .. } => {
                warn!("chat socket is not connected, dropping outbound frame");
                let _ = done.send(false);
            }
            Command::Shutdown => break,
        }
    }
}

async fn establish(url: Url, cmd_rx: &mut mpsc::Receiver<Command>) -> Establish {
    let connect = connect_async(url.as_str());
    tokio::pin!(connect);

    loop {
        tokio::select! {
            res = &mut connect => {
                return match res {
                    Ok((ws, _)) => Establish::Open(ws),
                    Err(e) => Establish::Failed(e),
                };
            }
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Send { done, .. }) => {
                    warn!("chat socket is still connecting, dropping outbound frame");
                    let _ = done.send(false);
                }
                Some(Command::Shutdown) | None => return Establish::Shutdown,
            }
        }
    }
}

async fn run_open(
    ws: &mut Socket,
    cmd_rx: &mut mpsc::Receiver<Command>,
    events: &broadcast::Sender<ServerEvent>,
    status_tx: &watch::Sender<Status>,
) -> OpenEnd {
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Send { frame, done }) => {
                    let sent = ws.send(WsMessage::Text(frame.to_text().into())).await;
                    if let Err(e) = &sent {
                        warn!("failed to write frame to chat socket: {e}");
                    }
                    let failed = sent.is_err();
                    let _ = done.send(!failed);
                    if failed {
                        return OpenEnd::Closed(None);
                    }
                }
                Some(Command::Shutdown) | None => return OpenEnd::Shutdown,
            },
            frame = ws.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    if let Some(event) = ServerEvent::parse(text.as_str()) {
                        if matches!(event, ServerEvent::Connection(_)) {
                            let _ = status_tx.send(Status::Connected);
                        }
                        let _ = events.send(event);
                    }
                }
                Some(Ok(WsMessage::Ping(payload))) => {
                    let _ = ws.send(WsMessage::Pong(payload)).await;
                }
                Some(Ok(WsMessage::Close(close))) => {
                    return OpenEnd::Closed(close.as_ref().map(|f| u16::from(f.code)));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("chat socket error: {e}");
                    let _ = status_tx.send(Status::Error);
                    let _ = events.send(ServerEvent::Error { message: e.to_string() });
                    return OpenEnd::Closed(None);
                }
                None => return OpenEnd::Closed(None),
            }
        }
    }
}

/// Sleep out the reconnect delay while keeping the command channel live.
/// Returns true when a shutdown arrived mid-wait.
async fn wait_retry(delay: Duration, cmd_rx: &mut mpsc::Receiver<Command>) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Send { done, .. }) => {
                    warn!("chat socket is reconnecting, dropping outbound frame");
                    let _ = done.send(false);
                }
                Some(Command::Shutdown) | None => return true,
            }
        }
    }
}

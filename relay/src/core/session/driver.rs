//! Async driver for a relay session.
//!
//! Owns both links and the in-flight connect attempt, multiplexes them with
//! `tokio::select!`, and feeds every observation to the [`Session`] state
//! machine one at a time. Actions are executed in order before the next
//! observation is taken.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::select;
use tracing::{debug, info, warn};

use super::state::{Session, SessionAction, SessionEvent};
use crate::core::link::{LinkEvent, MediaLink, OutboundConnector};
use crate::core::notifier::{NotifyDispatch, TranscriptNotifier};
use crate::errors::RelayResult;

/// Upper bound on how long a close request may take before the link is dropped.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

type ConnectFuture<'a> = Pin<Box<dyn Future<Output = RelayResult<Box<dyn MediaLink>>> + Send + 'a>>;

/// What woke the driver up.
enum Wake {
    Connected(RelayResult<Box<dyn MediaLink>>),
    Inbound(LinkEvent),
    Outbound(LinkEvent),
}

/// Run one session to completion.
///
/// The outbound connect starts immediately and runs concurrently with reading
/// the caller link. Returns the finished session once both links are closed.
pub async fn run_session<L>(
    session_id: String,
    mut inbound: L,
    connector: &dyn OutboundConnector,
    notifier: &TranscriptNotifier,
) -> Session
where
    L: MediaLink,
{
    let mut session = Session::new(session_id);
    let mut connect: Option<ConnectFuture<'_>> = Some(connector.connect());
    let mut outbound: Option<Box<dyn MediaLink>> = None;
    let mut pending: VecDeque<SessionEvent> = VecDeque::new();

    info!(session_id = %session.session_id(), "Twilio WebSocket connected");

    while !session.is_terminated() {
        let wake = select! {
            result = poll_connect(&mut connect) => Wake::Connected(result),
            event = inbound.recv() => Wake::Inbound(event),
            event = recv_outbound(&mut outbound) => Wake::Outbound(event),
        };

        let event = match wake {
            Wake::Connected(Ok(link)) => {
                connect = None;
                outbound = Some(link);
                SessionEvent::OutboundOpened
            }
            Wake::Connected(Err(e)) => {
                connect = None;
                SessionEvent::OutboundFailed(e.to_string())
            }
            Wake::Inbound(event) => SessionEvent::Inbound(event),
            Wake::Outbound(event) => SessionEvent::Outbound(event),
        };
        pending.push_back(event);

        while let Some(event) = pending.pop_front() {
            for action in session.handle(event) {
                if let Some(follow_up) = execute(
                    action,
                    &mut inbound,
                    &mut outbound,
                    &mut connect,
                    notifier,
                )
                .await
                {
                    pending.push_back(follow_up);
                }
            }
        }

        session.close_completed();
        debug_assert!(session.is_coupled());
    }

    // Anything still open at this point is released on drop
    drop(outbound);
    drop(connect);

    session
}

/// Carry out one action. Returns an event when the action itself failed.
async fn execute<L>(
    action: SessionAction,
    inbound: &mut L,
    outbound: &mut Option<Box<dyn MediaLink>>,
    connect: &mut Option<ConnectFuture<'_>>,
    notifier: &TranscriptNotifier,
) -> Option<SessionEvent>
where
    L: MediaLink,
{
    match action {
        SessionAction::ForwardToAgent(frame) => {
            let link = outbound.as_mut()?;
            match link.send_text(frame).await {
                Ok(()) => None,
                Err(e) => Some(SessionEvent::Outbound(LinkEvent::Error(e.to_string()))),
            }
        }
        SessionAction::ForwardToCaller(frame) => match inbound.send_text(frame).await {
            Ok(()) => None,
            Err(e) => Some(SessionEvent::Inbound(LinkEvent::Error(e.to_string()))),
        },
        SessionAction::CloseOutbound => {
            if connect.take().is_some() {
                debug!("Abandoning in-flight agent connect");
            }
            if let Some(mut link) = outbound.take() {
                close_with_grace(link.as_mut()).await;
            }
            None
        }
        SessionAction::CloseInbound => {
            close_with_grace(inbound).await;
            None
        }
        SessionAction::Notify(event) => {
            // Detached: the handle is dropped and the task is never awaited
            if let NotifyDispatch::Spawned(handle) = notifier.dispatch(event) {
                drop(handle);
            }
            None
        }
    }
}

async fn close_with_grace<L>(link: &mut L)
where
    L: MediaLink + ?Sized,
{
    if tokio::time::timeout(CLOSE_GRACE, link.close()).await.is_err() {
        warn!("Close request timed out, dropping connection");
    }
}

async fn poll_connect(connect: &mut Option<ConnectFuture<'_>>) -> RelayResult<Box<dyn MediaLink>> {
    match connect {
        Some(fut) => fut.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn recv_outbound(outbound: &mut Option<Box<dyn MediaLink>>) -> LinkEvent {
    match outbound {
        Some(link) => link.recv().await,
        None => std::future::pending().await,
    }
}

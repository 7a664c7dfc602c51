//! Human-in-the-loop review.
//!
//! The executor holds a [`ReviewGate`] and awaits one decision per request;
//! a review surface drains the matching [`ReviewInbox`]. The channel has room
//! for a single pending review, and the executor never sends a second request
//! before the first is answered.

mod terminal;

pub use terminal::TerminalReviewSurface;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::errors::OrchestratorError;
use crate::workflow::Role;

/// Output (or failure) awaiting a human decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRequest {
    pub role: Role,
    pub task_name: String,
    pub chapter: Option<u32>,
    /// Generated text, or the failure reason in error mode.
    pub content: String,
    /// Set when generation failed; the reviewer chooses retry or skip.
    pub error: Option<String>,
    /// 1-based generation attempt for this task.
    pub attempt: u32,
}

impl ReviewRequest {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A reviewer's answer.
///
/// In error mode `Approve` means skip the task, `Reject` means retry and
/// `Modify` means retry with guidance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
    Modify(String),
}

/// A request travelling to the surface together with its reply slot.
#[derive(Debug)]
pub struct PendingReview {
    pub request: ReviewRequest,
    reply: oneshot::Sender<ReviewDecision>,
}

impl PendingReview {
    pub fn respond(self, decision: ReviewDecision) {
        if self.reply.send(decision).is_err() {
            warn!(task = %self.request.task_name, "Review answered after the run stopped waiting");
        }
    }
}

/// Executor-side handle for opening reviews.
#[derive(Debug, Clone)]
pub struct ReviewGate {
    tx: mpsc::Sender<PendingReview>,
}

/// Surface-side end of the review channel.
#[derive(Debug)]
pub struct ReviewInbox {
    rx: mpsc::Receiver<PendingReview>,
}

impl ReviewGate {
    pub fn channel() -> (ReviewGate, ReviewInbox) {
        let (tx, rx) = mpsc::channel(1);
        (ReviewGate { tx }, ReviewInbox { rx })
    }

    /// Open a review and block until it is answered.
    ///
    /// Fails only when the surface has gone away.
    pub async fn request(&self, request: ReviewRequest) -> Result<ReviewDecision, OrchestratorError> {
        let task = request.task_name.clone();
        let (reply, answer) = oneshot::channel();
        debug!(task = %task, error_mode = request.is_error(), "Review pending");

        self.tx
            .send(PendingReview { request, reply })
            .await
            .map_err(|_| OrchestratorError::ReviewChannelClosed { task: task.clone() })?;

        answer
            .await
            .map_err(|_| OrchestratorError::ReviewChannelClosed { task })
    }
}

impl ReviewInbox {
    pub async fn next(&mut self) -> Option<PendingReview> {
        self.rx.recv().await
    }
}

/// Something that can show a request to a human and collect a decision.
#[async_trait]
pub trait ReviewSurface: Send {
    async fn review(&mut self, request: &ReviewRequest) -> Result<ReviewDecision>;
}

/// Answer reviews from `inbox` with `surface` until the gate is dropped.
///
/// A surface error drops the pending reply, which the waiting executor sees
/// as a closed review channel.
pub async fn serve_reviews<S: ReviewSurface>(mut inbox: ReviewInbox, mut surface: S) -> Result<()> {
    while let Some(pending) = inbox.next().await {
        let decision = surface.review(&pending.request).await?;
        pending.respond(decision);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ReviewRequest {
        ReviewRequest {
            role: Role::Director,
            task_name: "Concept review".into(),
            chapter: None,
            content: "Looks coherent.".into(),
            error: None,
            attempt: 1,
        }
    }

    struct Scripted(Vec<ReviewDecision>);

    #[async_trait]
    impl ReviewSurface for Scripted {
        async fn review(&mut self, _request: &ReviewRequest) -> Result<ReviewDecision> {
            if self.0.is_empty() {
                anyhow::bail!("script exhausted");
            }
            Ok(self.0.remove(0))
        }
    }

    #[tokio::test]
    async fn test_request_round_trip() {
        let (gate, inbox) = ReviewGate::channel();
        let server = tokio::spawn(serve_reviews(
            inbox,
            Scripted(vec![ReviewDecision::Modify("darker".into()), ReviewDecision::Approve]),
        ));

        assert_eq!(
            gate.request(request()).await.unwrap(),
            ReviewDecision::Modify("darker".into())
        );
        assert_eq!(gate.request(request()).await.unwrap(), ReviewDecision::Approve);

        drop(gate);
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_closed_surface_reports_channel_closed() {
        let (gate, inbox) = ReviewGate::channel();
        drop(inbox);
        match gate.request(request()).await {
            Err(OrchestratorError::ReviewChannelClosed { task }) => assert_eq!(task, "Concept review"),
            other => panic!("Expected ReviewChannelClosed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failing_surface_closes_pending_review() {
        let (gate, inbox) = ReviewGate::channel();
        let server = tokio::spawn(serve_reviews(inbox, Scripted(vec![])));
        assert!(matches!(
            gate.request(request()).await,
            Err(OrchestratorError::ReviewChannelClosed { .. })
        ));
        assert!(server.await.unwrap().is_err());
    }

    #[test]
    fn test_error_mode_flag() {
        let mut r = request();
        assert!(!r.is_error());
        r.error = Some("HTTP 500".into());
        assert!(r.is_error());
    }
}

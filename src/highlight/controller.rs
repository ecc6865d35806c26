//! Arm / confirm interaction for creating highlights
//!
//! A mark gesture arms a block and issues a single confirmation token. The
//! next confirm gesture either commits (inside the armed block) or dismisses
//! (anywhere else). Arming again before confirming invalidates the previous
//! token, so at most one confirmation is ever pending.

use tracing::{debug, info, warn, Span};

use super::marker::MarkerSurface;
use super::types::{CreateHighlightRequest, Highlight};
use crate::anchor::AnchorBuilder;
use crate::config::AnchorConfig;
use crate::content::{BlockIndex, ContentSurface, ElementId};
use crate::error::{ReaderError, Result};
use crate::remote::RemoteStore;

/// Identifies one arm cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArmToken(u64);

/// Where the most recent arm cycle stands
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    AwaitingConfirmation { token: ArmToken, block: BlockIndex },
    Committing { token: ArmToken, block: BlockIndex },
    Applied { block: BlockIndex, highlight_id: String },
    RolledBack { block: BlockIndex },
}

/// Result of a confirm gesture
#[derive(Debug)]
pub enum ConfirmOutcome {
    /// Nothing was pending
    Ignored,
    /// Confirmed outside the armed block; the arm was cancelled
    Dismissed,
    /// Confirmed inside the armed block
    Commit(PendingHighlight),
}

/// A confirmed highlight awaiting its creation request
#[derive(Debug)]
pub struct PendingHighlight {
    token: ArmToken,
    block: BlockIndex,
    request: CreateHighlightRequest,
}

impl PendingHighlight {
    pub fn request(&self) -> &CreateHighlightRequest {
        &self.request
    }

    pub fn block(&self) -> BlockIndex {
        self.block
    }

    /// Issue the creation request. Consumes the pending highlight, so one
    /// confirmation sends at most one request.
    pub async fn submit<R>(self, remote: &R) -> SubmittedHighlight
    where
        R: RemoteStore + ?Sized,
    {
        let result = remote.create_highlight(&self.request).await;
        SubmittedHighlight {
            pending: self,
            result,
        }
    }
}

/// A creation request that has been answered, ready to settle
#[derive(Debug)]
pub struct SubmittedHighlight {
    pending: PendingHighlight,
    result: Result<Highlight>,
}

impl SubmittedHighlight {
    pub fn block(&self) -> BlockIndex {
        self.pending.block
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Drives the arm / confirm / commit cycle over a marker surface
pub struct HighlightInteractionController<M> {
    article_id: String,
    builder: AnchorBuilder,
    color: String,
    markers: M,
    state: InteractionState,
    next_token: u64,
    span: Span,
}

impl<M: MarkerSurface> HighlightInteractionController<M> {
    pub fn new(article_id: &str, config: &AnchorConfig, markers: M, span: Span) -> Self {
        Self {
            article_id: article_id.to_string(),
            builder: AnchorBuilder::new(config, span.clone()),
            color: config.default_color.clone(),
            markers,
            state: InteractionState::Idle,
            next_token: 0,
            span,
        }
    }

    pub fn with_builder(mut self, builder: AnchorBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn markers(&self) -> &M {
        &self.markers
    }

    pub fn article_id(&self) -> &str {
        &self.article_id
    }

    /// Whether `token` still identifies the pending confirmation
    pub fn is_pending(&self, token: ArmToken) -> bool {
        matches!(self.state, InteractionState::AwaitingConfirmation { token: t, .. } if t == token)
    }

    /// Handle a mark gesture. Any pending arm is cancelled first, even when
    /// the new target has no text.
    pub fn arm<S>(&mut self, surface: &S, target: ElementId) -> Result<ArmToken>
    where
        S: ContentSurface + ?Sized,
    {
        self.cancel();

        let block = surface
            .resolve_block(target)
            .filter(|block| {
                surface
                    .block_text(*block)
                    .map_or(false, |text| !text.trim().is_empty())
            })
            .ok_or(ReaderError::EmptySelection)?;

        self.next_token += 1;
        let token = ArmToken(self.next_token);
        self.markers.mark_provisional(block);
        self.state = InteractionState::AwaitingConfirmation { token, block };

        debug!(parent: &self.span, token = token.0, block = block.0, "Armed block");
        Ok(token)
    }

    /// Cancel the pending arm, removing its marker. Commits already in
    /// flight are not affected.
    pub fn cancel(&mut self) -> bool {
        let InteractionState::AwaitingConfirmation { token, block } = self.state else {
            return false;
        };
        self.markers.clear_marker(block);
        self.state = InteractionState::Idle;
        debug!(parent: &self.span, token = token.0, block = block.0, "Cancelled pending arm");
        true
    }

    /// Handle a confirm gesture anywhere in the document
    pub fn confirm<S>(&mut self, surface: &S, target: ElementId) -> Result<ConfirmOutcome>
    where
        S: ContentSurface + ?Sized,
    {
        let InteractionState::AwaitingConfirmation { token, block } = self.state else {
            return Ok(ConfirmOutcome::Ignored);
        };

        if !surface.contains(block, target) {
            self.cancel();
            return Ok(ConfirmOutcome::Dismissed);
        }

        let anchor = match self.builder.build_for_block(surface, block) {
            Ok(anchor) => anchor,
            Err(err) => {
                self.markers.clear_marker(block);
                self.state = InteractionState::RolledBack { block };
                return Err(err);
            }
        };

        let request = CreateHighlightRequest::new(&self.article_id, anchor, &self.color);
        self.state = InteractionState::Committing { token, block };

        info!(
            parent: &self.span,
            highlight_id = %request.id,
            short_id = %request.short_id,
            block = block.0,
            "Committing highlight"
        );

        Ok(ConfirmOutcome::Commit(PendingHighlight {
            token,
            block,
            request,
        }))
    }

    /// Apply the outcome of a creation request to the markers. A newer arm
    /// or commit on the same block keeps its provisional marker.
    pub fn settle(&mut self, submitted: SubmittedHighlight) -> Result<Highlight> {
        let SubmittedHighlight {
            pending: PendingHighlight {
                token,
                block,
                request,
            },
            result,
        } = submitted;

        let current = matches!(self.state, InteractionState::Committing { token: t, .. } if t == token);
        let rearmed = match self.state {
            InteractionState::AwaitingConfirmation { token: t, block: b }
            | InteractionState::Committing { token: t, block: b } => b == block && t != token,
            _ => false,
        };

        match result {
            Ok(remote) => {
                let mut highlight = Highlight::optimistic(&request);
                if !highlight.reconcile(remote) {
                    warn!(
                        parent: &self.span,
                        highlight_id = %request.id,
                        "Remote store returned a different highlight, keeping local record"
                    );
                }

                self.markers.mark_permanent(block, &highlight.id);
                if rearmed {
                    self.markers.mark_provisional(block);
                }
                if current {
                    self.state = InteractionState::Applied {
                        block,
                        highlight_id: highlight.id.clone(),
                    };
                }

                info!(parent: &self.span, highlight_id = %highlight.id, block = block.0, "Highlight applied");
                Ok(highlight)
            }
            Err(err) => {
                if !rearmed {
                    self.markers.clear_marker(block);
                }
                if current {
                    self.state = InteractionState::RolledBack { block };
                }

                warn!(
                    parent: &self.span,
                    highlight_id = %request.id,
                    error = %err,
                    "Highlight creation failed, marker rolled back"
                );
                Err(err)
            }
        }
    }

    /// Confirm and, when that commits, submit and settle in one step
    pub async fn confirm_and_submit<S, R>(
        &mut self,
        surface: &S,
        target: ElementId,
        remote: &R,
    ) -> Result<Option<Highlight>>
    where
        S: ContentSurface + ?Sized,
        R: RemoteStore + ?Sized,
    {
        match self.confirm(surface, target)? {
            ConfirmOutcome::Commit(pending) => {
                let submitted = pending.submit(remote).await;
                self.settle(submitted).map(Some)
            }
            ConfirmOutcome::Ignored | ConfirmOutcome::Dismissed => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::BlockDocument;
    use crate::highlight::ids::is_short_id;
    use crate::highlight::{HighlightType, MarkerSet, MarkerState};
    use crate::remote::InMemoryRemote;

    const HTML: &str = "<p>Intro text.</p>\
        <p>The <b>quick</b> brown fox</p>\
        <p>Second paragraph</p>\
        <p>   </p>";

    fn setup() -> (BlockDocument, HighlightInteractionController<MarkerSet>) {
        let doc = BlockDocument::parse(HTML).unwrap();
        let controller = HighlightInteractionController::new(
            "article-1",
            &AnchorConfig::default(),
            MarkerSet::new(),
            Span::none(),
        );
        (doc, controller)
    }

    fn commits(outcome: ConfirmOutcome) -> Option<PendingHighlight> {
        match outcome {
            ConfirmOutcome::Commit(pending) => Some(pending),
            _ => None,
        }
    }

    #[test]
    fn test_confirm_inside_commits_once() {
        let (doc, mut controller) = setup();
        let bold = doc.elements_by_tag("b")[0];
        let p = doc.elements_by_tag("p")[1];

        controller.arm(&doc, bold).unwrap();
        let pending = commits(controller.confirm(&doc, p).unwrap()).unwrap();

        let request = pending.request();
        assert_eq!(request.anchor.quote, "The quick brown fox");
        assert!(!request.id.is_empty());
        assert!(is_short_id(&request.short_id));
        assert_eq!(request.highlight_type, HighlightType::Highlight);
        assert_eq!(request.color, "yellow");
        assert_eq!(request.article_id, "article-1");

        // The cycle is spent
        assert!(matches!(controller.confirm(&doc, p).unwrap(), ConfirmOutcome::Ignored));
    }

    #[test]
    fn test_confirm_outside_dismisses() {
        let (doc, mut controller) = setup();
        let paragraphs = doc.elements_by_tag("p");

        controller.arm(&doc, paragraphs[0]).unwrap();
        let outcome = controller.confirm(&doc, paragraphs[2]).unwrap();

        assert!(matches!(outcome, ConfirmOutcome::Dismissed));
        assert_eq!(controller.state(), &InteractionState::Idle);
        assert_eq!(controller.markers().provisional_count(), 0);
        assert!(matches!(
            controller.confirm(&doc, paragraphs[0]).unwrap(),
            ConfirmOutcome::Ignored
        ));
    }

    #[test]
    fn test_rearm_cancels_previous() {
        let (doc, mut controller) = setup();
        let paragraphs = doc.elements_by_tag("p");

        let first = controller.arm(&doc, paragraphs[1]).unwrap();
        let second = controller.arm(&doc, paragraphs[2]).unwrap();

        assert!(!controller.is_pending(first));
        assert!(controller.is_pending(second));
        assert_eq!(controller.markers().state(BlockIndex(1)), None);
        assert_eq!(controller.markers().provisional_count(), 1);

        // A confirm that would have matched the first arm produces nothing
        assert!(matches!(
            controller.confirm(&doc, paragraphs[1]).unwrap(),
            ConfirmOutcome::Dismissed
        ));
    }

    #[test]
    fn test_rearm_then_confirm_second() {
        let (doc, mut controller) = setup();
        let paragraphs = doc.elements_by_tag("p");

        controller.arm(&doc, paragraphs[1]).unwrap();
        controller.arm(&doc, paragraphs[2]).unwrap();

        let pending = commits(controller.confirm(&doc, paragraphs[2]).unwrap()).unwrap();
        assert_eq!(pending.request().anchor.quote, "Second paragraph");
        assert_eq!(pending.block(), BlockIndex(2));
        assert!(matches!(
            controller.confirm(&doc, paragraphs[2]).unwrap(),
            ConfirmOutcome::Ignored
        ));
    }

    #[test]
    fn test_arm_whitespace_block_is_empty_selection() {
        let (doc, mut controller) = setup();
        let paragraphs = doc.elements_by_tag("p");

        let token = controller.arm(&doc, paragraphs[0]).unwrap();
        let err = controller.arm(&doc, paragraphs[3]).unwrap_err();

        assert!(matches!(err, ReaderError::EmptySelection));
        assert!(!controller.is_pending(token));
        assert_eq!(controller.state(), &InteractionState::Idle);
    }

    #[tokio::test]
    async fn test_commit_success_applies_marker() {
        let (doc, mut controller) = setup();
        let remote = InMemoryRemote::new();
        let p = doc.elements_by_tag("p")[1];

        controller.arm(&doc, p).unwrap();
        let highlight = controller
            .confirm_and_submit(&doc, p, &remote)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(remote.create_calls(), 1);
        assert_eq!(highlight.quote(), "The quick brown fox");
        assert_eq!(
            controller.markers().state(BlockIndex(1)),
            Some(MarkerState::Permanent(vec![highlight.id.clone()]))
        );
        assert!(matches!(controller.state(), InteractionState::Applied { .. }));
    }

    #[tokio::test]
    async fn test_commit_failure_rolls_back() {
        let (doc, mut controller) = setup();
        let remote = InMemoryRemote::new();
        remote.set_offline(true);
        let p = doc.elements_by_tag("p")[1];

        controller.arm(&doc, p).unwrap();
        let err = controller.confirm_and_submit(&doc, p, &remote).await.unwrap_err();

        assert!(matches!(err, ReaderError::TransportFailure(_)));
        assert_eq!(controller.markers().state(BlockIndex(1)), None);
        assert_eq!(
            controller.state(),
            &InteractionState::RolledBack { block: BlockIndex(1) }
        );
    }

    #[tokio::test]
    async fn test_arming_allowed_while_committing() {
        let (doc, mut controller) = setup();
        let remote = InMemoryRemote::new();
        let paragraphs = doc.elements_by_tag("p");

        controller.arm(&doc, paragraphs[1]).unwrap();
        let pending = commits(controller.confirm(&doc, paragraphs[1]).unwrap()).unwrap();

        // New arm while the first commit is in flight
        let token = controller.arm(&doc, paragraphs[2]).unwrap();

        let submitted = pending.submit(&remote).await;
        controller.settle(submitted).unwrap();

        assert!(controller.is_pending(token));
        assert_eq!(controller.markers().highlights(BlockIndex(1)).len(), 1);
        assert_eq!(
            controller.markers().state(BlockIndex(2)),
            Some(MarkerState::Provisional)
        );
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_newer_commit_marker() {
        let (doc, mut controller) = setup();
        let remote = InMemoryRemote::new();
        let p = doc.elements_by_tag("p")[1];

        controller.arm(&doc, p).unwrap();
        let first = commits(controller.confirm(&doc, p).unwrap()).unwrap();
        controller.arm(&doc, p).unwrap();
        let second = commits(controller.confirm(&doc, p).unwrap()).unwrap();

        // First request fails while the second is still in flight
        remote.set_offline(true);
        let failed = first.submit(&remote).await;
        assert!(!failed.is_ok());
        assert!(controller.settle(failed).is_err());

        assert_eq!(
            controller.markers().state(BlockIndex(1)),
            Some(MarkerState::Provisional)
        );
        assert!(matches!(controller.state(), InteractionState::Committing { .. }));

        remote.set_offline(false);
        let submitted = second.submit(&remote).await;
        let highlight = controller.settle(submitted).unwrap();

        assert_eq!(
            controller.markers().state(BlockIndex(1)),
            Some(MarkerState::Permanent(vec![highlight.id.clone()]))
        );
        assert!(matches!(controller.state(), InteractionState::Applied { .. }));
    }

    #[tokio::test]
    async fn test_applied_commit_keeps_newer_commit_marker() {
        let (doc, mut controller) = setup();
        let remote = InMemoryRemote::new();
        let p = doc.elements_by_tag("p")[1];

        controller.arm(&doc, p).unwrap();
        let first = commits(controller.confirm(&doc, p).unwrap()).unwrap();
        controller.arm(&doc, p).unwrap();
        let _second = commits(controller.confirm(&doc, p).unwrap()).unwrap();

        let submitted = first.submit(&remote).await;
        let highlight = controller.settle(submitted).unwrap();

        assert_eq!(controller.markers().highlights(BlockIndex(1)), [highlight.id.clone()]);
        assert_eq!(
            controller.markers().state(BlockIndex(1)),
            Some(MarkerState::Provisional)
        );
    }

    #[tokio::test]
    async fn test_one_request_per_arm_cycle() {
        let (doc, mut controller) = setup();
        let remote = InMemoryRemote::new();
        let p = doc.elements_by_tag("p")[1];

        controller.arm(&doc, p).unwrap();
        let pending = commits(controller.confirm(&doc, p).unwrap()).unwrap();
        let submitted = pending.submit(&remote).await;
        assert_eq!(remote.create_calls(), 1);

        // The spent cycle cannot produce another request
        assert!(matches!(controller.confirm(&doc, p).unwrap(), ConfirmOutcome::Ignored));
        assert!(controller
            .confirm_and_submit(&doc, p, &remote)
            .await
            .unwrap()
            .is_none());
        controller.settle(submitted).unwrap();

        assert_eq!(remote.create_calls(), 1);
        assert_eq!(remote.highlight_count(), 1);
    }
}

//! Page ↔ background messaging.
//!
//! The background context is one tokio task that owns the
//! [`CaptureCoordinator`] and serves capture jobs from an mpsc queue, each
//! job carrying a oneshot for its reply. The page context owns the
//! selection overlay and the result panel and only ever talks to the
//! background through a [`BackgroundHandle`].

use crate::capture::{ScreenSource, SelectionRect};
use crate::error::{ErrorKind, Result};
use crate::llm::HttpTransport;
use crate::pipeline::CaptureCoordinator;
use crate::render::{
    ClipboardError, CopyMethod, DetectedCommandClipboard, ResultPresenter, SystemClipboard,
};
use crate::selection::{
    CaptureRequest, Phase, Point, PointerButton, PointerUp, SelectionController, Viewport,
};
use crate::settings::ConfigSource;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const QUEUE_DEPTH: usize = 8;
const BACKGROUND_GONE: &str = "Background service is not running, reload and try again";

fn default_scale_factor() -> f64 {
    1.0
}

/// Cross-context message, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    StartCapture,
    #[serde(rename_all = "camelCase")]
    CaptureAndOcr {
        rect: SelectionRect,
        #[serde(alias = "devicePixelRatio", default = "default_scale_factor")]
        scale_factor: f64,
    },
}

/// Synchronous acknowledgement of `startCapture`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}

/// Reply to `captureAndOcr`: `{text}` or `{error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OcrReply {
    Text {
        text: String,
    },
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<ErrorKind>,
    },
}

impl From<Result<String>> for OcrReply {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(text) => OcrReply::Text { text },
            Err(e) => OcrReply::Error {
                error: e.to_string(),
                kind: Some(e.kind()),
            },
        }
    }
}

impl OcrReply {
    fn background_gone() -> Self {
        OcrReply::Error {
            error: BACKGROUND_GONE.to_string(),
            kind: None,
        }
    }
}

struct CaptureJob {
    rect: SelectionRect,
    scale_factor: f64,
    reply: oneshot::Sender<OcrReply>,
}

/// Page-side sender for capture jobs. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BackgroundHandle {
    jobs: mpsc::Sender<CaptureJob>,
}

impl BackgroundHandle {
    /// Run one capture session and wait for its reply. Never hangs on a
    /// dead background: a closed queue or dropped reply becomes an error.
    pub async fn capture_and_ocr(&self, rect: SelectionRect, scale_factor: f64) -> OcrReply {
        let (reply, rx) = oneshot::channel();
        let job = CaptureJob {
            rect,
            scale_factor,
            reply,
        };
        if self.jobs.send(job).await.is_err() {
            log::error!("[PIPELINE] Background queue closed");
            return OcrReply::background_gone();
        }
        rx.await.unwrap_or_else(|_| {
            log::error!("[PIPELINE] Background dropped the reply");
            OcrReply::background_gone()
        })
    }

    /// Route a decoded message. Only `captureAndOcr` is addressed to the
    /// background; anything else gets no reply.
    pub async fn handle_message(&self, message: Message) -> Option<OcrReply> {
        match message {
            Message::CaptureAndOcr { rect, scale_factor } => {
                Some(self.capture_and_ocr(rect, scale_factor).await)
            }
            Message::StartCapture => {
                log::debug!("[PIPELINE] startCapture is not handled by the background");
                None
            }
        }
    }
}

/// Start the background task. It exits once every handle is dropped.
pub fn spawn_background<S, T, C>(
    coordinator: CaptureCoordinator<S, T, C>,
) -> (BackgroundHandle, JoinHandle<()>)
where
    S: ScreenSource + 'static,
    T: HttpTransport + 'static,
    C: ConfigSource + 'static,
{
    let (jobs, mut queue) = mpsc::channel::<CaptureJob>(QUEUE_DEPTH);
    let task = tokio::spawn(async move {
        log::info!("[STARTUP] Background capture service running");
        while let Some(job) = queue.recv().await {
            let reply = OcrReply::from(coordinator.handle(&job.rect, job.scale_factor).await);
            if job.reply.send(reply).is_err() {
                log::warn!("[PIPELINE] Page went away before the reply was delivered");
            }
        }
        log::info!("[PIPELINE] Background capture service stopped");
    });
    (BackgroundHandle { jobs }, task)
}

/// Page-side state: one selection controller, one result panel.
pub struct PageContext {
    selection: SelectionController,
    presenter: ResultPresenter,
    background: BackgroundHandle,
}

impl PageContext {
    pub fn new(viewport: Viewport, background: BackgroundHandle) -> Self {
        Self {
            selection: SelectionController::new(viewport),
            presenter: ResultPresenter::new(),
            background,
        }
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn presenter(&self) -> &ResultPresenter {
        &self.presenter
    }

    /// Panel drag, close and resize go straight to the presenter.
    pub fn presenter_mut(&mut self) -> &mut ResultPresenter {
        &mut self.presenter
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.selection.set_viewport(viewport);
    }

    /// Route a decoded message addressed to the page.
    pub fn handle_message(&mut self, message: &Message) -> Option<Ack> {
        match message {
            Message::StartCapture => Some(self.start_capture()),
            Message::CaptureAndOcr { .. } => None,
        }
    }

    /// Arm a new selection. A previous result panel is removed when the
    /// session starts; a live session makes this a no-op.
    pub fn start_capture(&mut self) -> Ack {
        if self.selection.activate() {
            self.presenter.close();
        }
        Ack { ok: true }
    }

    pub fn pointer_down(&mut self, at: Point, button: PointerButton) -> bool {
        self.selection.pointer_down(at, button)
    }

    pub fn pointer_move(&mut self, at: Point) -> bool {
        self.selection.pointer_move(at)
    }

    pub fn key_down(&mut self, key: &str) -> bool {
        self.selection.key_down(key)
    }

    /// Finish the drag. A dispatched selection opens the panel in its
    /// loading state and returns the request to send.
    pub fn pointer_up(&mut self, at: Point) -> Option<CaptureRequest> {
        match self.selection.pointer_up(at) {
            PointerUp::Dispatch(request) => {
                self.presenter
                    .show_loading(request.panel_position, self.selection.viewport());
                Some(request)
            }
            PointerUp::Cancelled | PointerUp::Ignored => None,
        }
    }

    /// Send a dispatched request and show whatever comes back.
    pub async fn dispatch(&mut self, request: CaptureRequest) -> OcrReply {
        let reply = self
            .background
            .capture_and_ocr(request.rect, request.scale_factor)
            .await;
        self.deliver(&reply);
        reply
    }

    /// `pointer_up` and `dispatch` in one step.
    pub async fn release(&mut self, at: Point) -> Option<OcrReply> {
        let request = self.pointer_up(at)?;
        Some(self.dispatch(request).await)
    }

    /// Apply a reply: the session ends and the panel shows the outcome.
    pub fn deliver(&mut self, reply: &OcrReply) {
        if self.selection.phase() == Phase::Dispatched {
            self.selection.complete();
        }
        match reply {
            OcrReply::Text { text } => self.presenter.show_result(text),
            OcrReply::Error { error, .. } => self.presenter.show_error(error),
        }
    }

    /// Copy the shown result through the system clipboard, falling back to
    /// a platform copy command.
    pub fn copy_result(
        &mut self,
        now: Instant,
    ) -> std::result::Result<CopyMethod, ClipboardError> {
        self.presenter
            .copy(&mut SystemClipboard, &mut DetectedCommandClipboard, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use serde_json::json;

    #[test]
    fn message_wire_format() {
        let start: Message = serde_json::from_value(json!({"action": "startCapture"})).unwrap();
        assert_eq!(start, Message::StartCapture);

        let capture: Message = serde_json::from_value(json!({
            "action": "captureAndOcr",
            "rect": {"x": 1.0, "y": 2.0, "width": 30.0, "height": 40.0},
            "devicePixelRatio": 2.0
        }))
        .unwrap();
        assert_eq!(
            capture,
            Message::CaptureAndOcr {
                rect: SelectionRect {
                    x: 1.0,
                    y: 2.0,
                    width: 30.0,
                    height: 40.0
                },
                scale_factor: 2.0
            }
        );
        assert_eq!(
            serde_json::to_value(&capture).unwrap()["scaleFactor"],
            json!(2.0)
        );

        let no_ratio: Message = serde_json::from_value(json!({
            "action": "captureAndOcr",
            "rect": {"x": 0.0, "y": 0.0, "width": 10.0, "height": 10.0}
        }))
        .unwrap();
        assert!(matches!(no_ratio, Message::CaptureAndOcr { scale_factor, .. } if scale_factor == 1.0));
    }

    #[test]
    fn reply_wire_format() {
        let ok = OcrReply::from(Ok("hello".to_string()));
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!({"text": "hello"}));

        let err = OcrReply::from(Err(OcrError::SafetyRejected));
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], json!("safetyRejected"));
        assert!(value["error"].as_str().unwrap().contains("safety"));

        let plain: OcrReply = serde_json::from_value(json!({"error": "boom"})).unwrap();
        assert_eq!(
            plain,
            OcrReply::Error {
                error: "boom".to_string(),
                kind: None
            }
        );
    }

    #[tokio::test]
    async fn dead_background_replies_with_error() {
        let (jobs, queue) = mpsc::channel(1);
        drop(queue);
        let handle = BackgroundHandle { jobs };
        let reply = handle
            .capture_and_ocr(
                SelectionRect {
                    x: 0.0,
                    y: 0.0,
                    width: 50.0,
                    height: 50.0,
                },
                1.0,
            )
            .await;
        assert_eq!(reply, OcrReply::background_gone());
        assert!(handle.handle_message(Message::StartCapture).await.is_none());
    }

    #[tokio::test]
    async fn dropped_reply_sender_replies_with_error() {
        let (jobs, mut queue) = mpsc::channel::<CaptureJob>(1);
        tokio::spawn(async move {
            // Take the job and drop it unanswered.
            let _ = queue.recv().await;
        });
        let handle = BackgroundHandle { jobs };
        let reply = handle
            .capture_and_ocr(
                SelectionRect {
                    x: 0.0,
                    y: 0.0,
                    width: 50.0,
                    height: 50.0,
                },
                1.0,
            )
            .await;
        assert_eq!(reply, OcrReply::background_gone());
    }

    #[tokio::test]
    async fn page_start_capture_acks_and_clears_old_panel() {
        let (jobs, _queue) = mpsc::channel(1);
        let mut page = PageContext::new(
            Viewport {
                width: 1600.0,
                height: 1000.0,
                scale_factor: 1.0,
            },
            BackgroundHandle { jobs },
        );

        assert_eq!(page.handle_message(&Message::StartCapture), Some(Ack { ok: true }));
        page.pointer_down(Point { x: 0.0, y: 0.0 }, PointerButton::Primary);
        let request = page.pointer_up(Point { x: 100.0, y: 100.0 }).unwrap();
        assert!(page.presenter().panel().is_some());

        // Live session: ack, but nothing changes.
        assert_eq!(page.start_capture(), Ack { ok: true });
        assert!(page.presenter().panel().is_some());

        page.deliver(&OcrReply::Text {
            text: "done".to_string(),
        });
        assert_eq!(page.selection().phase(), Phase::Idle);
        assert_eq!(page.presenter().copy_text(), Some("done"));
        assert_eq!(request.scale_factor, 1.0);

        page.start_capture();
        assert_eq!(page.selection().phase(), Phase::Armed);
        assert!(page.presenter().panel().is_none());
    }
}

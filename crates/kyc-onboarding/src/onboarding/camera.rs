//! Camera / face-detection subscription.
//!
//! A [`FrameSource`] wraps whatever detection library drives the camera. The
//! session runs it as a background producer and keeps only the latest face
//! count, which the selfie capture reads synchronously.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// A detected face in normalised (0..1) frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x_center: f32,
    pub y_center: f32,
    pub width: f32,
    pub height: f32,
}

/// One processed frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameResult {
    pub detections: Vec<Detection>,
}

impl FrameResult {
    pub fn face_count(&self) -> usize {
        self.detections.len()
    }

    pub fn bounding_boxes(&self) -> Vec<BoundingBox> {
        self.detections
            .iter()
            .enumerate()
            .map(|(index, detection)| BoundingBox::from_detection(index, detection))
            .collect()
    }
}

/// Overlay rectangle in percentages of the preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundingBox {
    pub id: String,
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn from_detection(index: usize, detection: &Detection) -> Self {
        let width = detection.width * 100.0;
        let height = detection.height * 100.0;
        Self {
            id: format!("face-{index}"),
            top: detection.y_center * 100.0 - height / 2.0,
            left: detection.x_center * 100.0 - width / 2.0,
            width,
            height,
        }
    }
}

/// Detection adapter. `None` ends the stream; dropping the source must release
/// the underlying media stream.
#[async_trait]
pub trait FrameSource: Send + 'static {
    async fn next_frame(&mut self) -> Option<FrameResult>;
}

/// Outcome of probing the device for a camera before the selfie step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraAvailability {
    Ready,
    NoCamera,
    Unsupported,
    AccessDenied,
}

impl CameraAvailability {
    pub const fn message(self) -> &'static str {
        match self {
            CameraAvailability::Ready => {
                "Camera ready. Capture a live selfie or switch to ID upload."
            }
            CameraAvailability::NoCamera => {
                "No camera detected. Please upload ID front/back or a passport."
            }
            CameraAvailability::Unsupported => {
                "Media devices are unavailable in this environment."
            }
            CameraAvailability::AccessDenied => {
                "Unable to access the camera. Upload ID front/back or a passport."
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("No face detected yet. Center your face and try again.")]
    NoFaceDetected,
    #[error("Unable to capture image. Please try again.")]
    EmptyCapture,
}

/// Running camera producer. Reads are synchronous; [`CameraSession::stop`]
/// returns only after the source has been dropped.
pub struct CameraSession {
    faces: watch::Receiver<usize>,
    stop: Option<oneshot::Sender<()>>,
    producer: Option<JoinHandle<()>>,
}

impl CameraSession {
    /// Spawn the producer on the current tokio runtime.
    pub fn start<S: FrameSource>(mut source: S) -> Self {
        let (faces_tx, faces_rx) = watch::channel(0usize);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let producer = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    frame = source.next_frame() => match frame {
                        Some(frame) => {
                            faces_tx.send_replace(frame.face_count());
                        }
                        None => {
                            faces_tx.send_replace(0);
                            break;
                        }
                    },
                }
            }
            drop(source);
        });

        Self {
            faces: faces_rx,
            stop: Some(stop_tx),
            producer: Some(producer),
        }
    }

    pub fn faces_detected(&self) -> usize {
        *self.faces.borrow()
    }

    pub fn face_present(&self) -> bool {
        self.faces_detected() > 0
    }

    /// Wait for the next published detection count.
    pub async fn changed(&mut self) -> Option<usize> {
        self.faces.changed().await.ok()?;
        Some(*self.faces.borrow())
    }

    /// Cancel the producer and wait for it to release the source.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(producer) = self.producer.take() {
            if let Err(err) = producer.await {
                if err.is_panic() {
                    tracing::warn!("camera producer panicked before shutdown");
                }
            }
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

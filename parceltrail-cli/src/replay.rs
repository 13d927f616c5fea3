//! Recorded camera sessions replayed through the real scanner
//!
//! A session file captures what a handheld camera saw, one entry per
//! display refresh: `null` for a frame with no readable code, or the text a
//! code reader extracted from that frame.

use bytes::Bytes;
use parceltrail_core::{
    scanner::{
        CameraDevice, CameraProvider, CameraRequest, CodeDecoder, Facing, Frame, FrameScheduler,
        TickId, VideoStream,
    },
    CameraFault,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Replayed frame dimensions
const FRAME_WIDTH: u32 = 640;
const FRAME_HEIGHT: u32 = 480;

/// Fault a recorded session reproduces on open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedFault {
    /// Operator refused access
    PermissionDenied,
    /// No camera present
    NoDevice,
    /// No camera API
    Unsupported,
}

impl From<RecordedFault> for CameraFault {
    fn from(fault: RecordedFault) -> Self {
        match fault {
            RecordedFault::PermissionDenied => CameraFault::PermissionDenied,
            RecordedFault::NoDevice => CameraFault::NoDevice,
            RecordedFault::Unsupported => CameraFault::Unsupported,
        }
    }
}

/// A recorded capture session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordedSession {
    /// Cameras the device reported
    #[serde(default)]
    pub devices: Vec<CameraDevice>,

    /// Fault raised when opening, if the recording captured one
    #[serde(default)]
    pub fault: Option<RecordedFault>,

    /// Per-refresh frames
    #[serde(default)]
    pub frames: Vec<Option<String>>,
}

/// Camera provider replaying a [`RecordedSession`]
pub struct ReplayCamera {
    session: RecordedSession,
}

impl ReplayCamera {
    /// Create a provider for a session
    pub fn new(session: RecordedSession) -> Self {
        Self { session }
    }
}

impl CameraProvider for ReplayCamera {
    type Stream = ReplayStream;

    fn open(&mut self, request: &CameraRequest) -> Result<ReplayStream, CameraFault> {
        if let Some(fault) = self.session.fault {
            return Err(fault.into());
        }
        if let Some(id) = &request.device_id {
            let known = self.session.devices.iter().any(|d| &d.id == id);
            if !self.session.devices.is_empty() && !known {
                return Err(CameraFault::NoDevice);
            }
        }

        Ok(ReplayStream {
            frames: self.session.frames.iter().cloned().collect(),
            stopped: false,
        })
    }

    fn devices(&self) -> Vec<CameraDevice> {
        self.session.devices.clone()
    }
}

/// Stream over recorded frames
pub struct ReplayStream {
    frames: VecDeque<Option<String>>,
    stopped: bool,
}

impl VideoStream for ReplayStream {
    fn capture(&mut self) -> Option<Frame> {
        if self.stopped {
            return None;
        }
        let text = self.frames.pop_front()?.unwrap_or_default();
        Some(Frame::new(FRAME_WIDTH, FRAME_HEIGHT, Bytes::from(text)))
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.frames.clear();
    }
}

/// Decoder for replayed frames: the frame carries the text verbatim
pub struct TextDecoder;

impl CodeDecoder for TextDecoder {
    fn decode(&mut self, frame: &Frame) -> Option<String> {
        let text = std::str::from_utf8(&frame.data).ok()?.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// Scheduler handing out sequential tick ids; the replay driver fires them
#[derive(Debug, Default)]
pub struct RefreshScheduler {
    next: u64,
    slot: Option<TickId>,
}

impl FrameScheduler for RefreshScheduler {
    fn schedule(&mut self) -> TickId {
        self.next += 1;
        let tick = TickId(self.next);
        self.slot = Some(tick);
        tick
    }

    fn cancel(&mut self, tick: TickId) {
        if self.slot == Some(tick) {
            self.slot = None;
        }
    }
}

/// Whether the session prefers a rear camera among its devices
pub fn has_rear_camera(session: &RecordedSession) -> bool {
    session.devices.iter().any(|d| d.facing == Facing::Environment)
}

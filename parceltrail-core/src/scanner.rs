//! Live camera code scanner
//!
//! The scanner owns one camera stream at a time and runs a cooperative
//! decode loop driven by display-refresh ticks: each tick captures a frame,
//! tries to decode it and either finishes or asks for exactly one more tick.
//! Every exit path (found, manual entry, close, switch, drop) cancels the
//! pending tick before releasing the stream, and the stream is released
//! exactly once.

use crate::constants::DEFAULT_SETTLE_DELAY;
use crate::error::{CameraFault, ScannerError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// One captured video frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Luminance plane, one byte per pixel
    pub data: Bytes,
}

impl Frame {
    /// Create a new frame
    pub fn new(width: u32, height: u32, data: Bytes) -> Self {
        Self {
            width,
            height,
            data,
        }
    }
}

/// Which way a camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Rear camera, pointing away from the operator
    Environment,
    /// Front camera, pointing at the operator
    User,
    /// No preference / unknown
    Any,
}

/// A camera known to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Provider-specific device id
    pub id: String,

    /// Human-readable name
    pub label: String,

    /// Facing, when the provider reports it
    pub facing: Facing,
}

/// What to ask the provider for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraRequest {
    /// Preferred facing
    pub facing: Facing,

    /// Specific device, overriding `facing`
    pub device_id: Option<String>,
}

/// A live camera stream
pub trait VideoStream {
    /// Grab the current frame, if one is available yet
    fn capture(&mut self) -> Option<Frame>;

    /// Stop the stream and release the hardware
    fn stop(&mut self);
}

/// Source of camera streams (platform camera API)
pub trait CameraProvider {
    /// Stream type handed out by this provider
    type Stream: VideoStream;

    /// Ask for camera access and start streaming
    fn open(&mut self, request: &CameraRequest) -> Result<Self::Stream, CameraFault>;

    /// Cameras currently available
    fn devices(&self) -> Vec<CameraDevice>;
}

/// Optical code decoder (QR, barcode)
pub trait CodeDecoder {
    /// Decode a code from the frame, if one is visible
    fn decode(&mut self, frame: &Frame) -> Option<String>;
}

/// Handle of one scheduled display-refresh tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(pub u64);

/// Schedules scanner ticks on the host's display refresh
pub trait FrameScheduler {
    /// Schedule one tick; the host later calls [`CodeScanner::tick`] with it
    fn schedule(&mut self) -> TickId;

    /// Cancel a tick that has not fired yet
    fn cancel(&mut self, tick: TickId);
}

/// Scanner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Running on a phone or tablet
    pub handheld: bool,

    /// Prefer the rear camera on handheld devices
    pub prefer_rear_camera: bool,

    /// Pause between releasing a camera and acquiring another
    pub settle_delay: Duration,

    /// Device to open first, overriding facing preferences
    pub preferred_device: Option<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            handheld: true,
            prefer_rear_camera: true,
            settle_delay: DEFAULT_SETTLE_DELAY,
            preferred_device: None,
        }
    }
}

/// Where a decoded payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeSource {
    /// Read from a camera frame
    Camera,
    /// Typed in by the operator
    Manual,
}

/// A payload emitted by the scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    /// Raw payload text
    pub payload: String,

    /// How it was obtained
    pub source: DecodeSource,
}

/// Observable scanner state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerState {
    /// Nothing opened yet
    Idle,
    /// Waiting for the provider to grant a stream
    AcquiringPermission,
    /// Stream open, decode loop running
    Streaming,
    /// A payload was emitted (terminal)
    Found,
    /// Camera acquisition failed (terminal, needs an explicit reopen)
    Error(CameraFault),
    /// Closed by the caller
    Stopped,
}

/// Result of one scanner tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick was cancelled or belongs to an older session; nothing done
    Stale,
    /// Nothing decoded, one more tick scheduled
    Continue,
    /// Payload found; stream released
    Decoded(Decoded),
}

/// Owns a stream and stops it exactly once
pub struct StreamGuard<S: VideoStream> {
    stream: Option<S>,
}

impl<S: VideoStream> StreamGuard<S> {
    /// Take ownership of a started stream
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    /// Capture from the stream, if still held
    pub fn capture(&mut self) -> Option<Frame> {
        self.stream.as_mut().and_then(|s| s.capture())
    }

    /// Whether the stream is still held
    pub fn is_live(&self) -> bool {
        self.stream.is_some()
    }

    /// Stop the stream. Returns false if it was already released.
    pub fn release(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop();
                true
            }
            None => false,
        }
    }
}

impl<S: VideoStream> Drop for StreamGuard<S> {
    fn drop(&mut self) {
        self.release();
    }
}

struct Session<S: VideoStream> {
    guard: StreamGuard<S>,
    pending: Option<TickId>,
    device: Option<String>,
}

type DecodedListener = Box<dyn FnMut(&Decoded)>;

/// Camera-driven code scanner
///
/// One scanner holds at most one stream; a second [`open`](Self::open)
/// while streaming is refused with [`ScannerError::AlreadyOpen`]. Camera
/// failures are terminal for the session and never retried automatically.
/// There is no decode timeout, so callers should always offer
/// [`submit_manual`](Self::submit_manual) as a way out.
pub struct CodeScanner<C, D, S>
where
    C: CameraProvider,
    D: CodeDecoder,
    S: FrameScheduler,
{
    camera: C,
    decoder: D,
    scheduler: S,
    config: ScannerConfig,
    state: ScannerState,
    session: Option<Session<C::Stream>>,
    listener: Option<DecodedListener>,
}

impl<C, D, S> CodeScanner<C, D, S>
where
    C: CameraProvider,
    D: CodeDecoder,
    S: FrameScheduler,
{
    /// Create an idle scanner
    pub fn new(camera: C, decoder: D, scheduler: S, config: ScannerConfig) -> Self {
        Self {
            camera,
            decoder,
            scheduler,
            config,
            state: ScannerState::Idle,
            session: None,
            listener: None,
        }
    }

    /// Register the callback invoked on every emitted payload
    pub fn on_decoded(&mut self, listener: impl FnMut(&Decoded) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Current state
    pub fn state(&self) -> &ScannerState {
        &self.state
    }

    /// Device id of the open stream, when one was requested explicitly
    pub fn active_device(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.device.as_deref())
    }

    /// Tick currently awaited, if any
    pub fn pending_tick(&self) -> Option<TickId> {
        self.session.as_ref().and_then(|s| s.pending)
    }

    /// Cameras the provider reports
    pub fn devices(&self) -> Vec<CameraDevice> {
        self.camera.devices()
    }

    /// Acquire a camera and start the decode loop
    pub fn open(&mut self) -> Result<(), ScannerError> {
        if self.session.is_some() {
            return Err(ScannerError::AlreadyOpen);
        }
        let request = self.initial_request();
        self.acquire(request)
    }

    /// Stop scanning and release the camera. Does nothing if not streaming.
    pub fn close(&mut self) {
        if self.shutdown() {
            #[cfg(feature = "logging")]
            debug!("Scanner closed by caller");
            self.state = ScannerState::Stopped;
        }
    }

    /// Release the current camera, wait for it to settle, then open `device_id`
    pub fn switch_device(&mut self, device_id: &str) -> Result<(), ScannerError> {
        if !self.shutdown() {
            return Err(ScannerError::NotStreaming);
        }

        #[cfg(feature = "logging")]
        debug!("Switching camera to {}", device_id);

        if !self.config.settle_delay.is_zero() {
            std::thread::sleep(self.config.settle_delay);
        }

        self.acquire(CameraRequest {
            facing: Facing::Any,
            device_id: Some(device_id.to_string()),
        })
    }

    /// Accept a typed-in payload instead of a camera decode
    pub fn submit_manual(&mut self, text: &str) -> Result<Decoded, ScannerError> {
        let payload = text.trim();
        if payload.is_empty() {
            return Err(ScannerError::EmptyManualEntry);
        }

        Ok(self.finish(Decoded {
            payload: payload.to_string(),
            source: DecodeSource::Manual,
        }))
    }

    /// Run one decode step for a fired tick
    ///
    /// Ticks that are not the one currently awaited are ignored, so at most
    /// one decode attempt is ever in flight.
    pub fn tick(&mut self, tick: TickId) -> TickOutcome {
        let session = match self.session.as_mut() {
            Some(session) if session.pending == Some(tick) => session,
            _ => return TickOutcome::Stale,
        };
        session.pending = None;

        let payload = session
            .guard
            .capture()
            .and_then(|frame| self.decoder.decode(&frame))
            .filter(|payload| !payload.trim().is_empty());

        match payload {
            Some(payload) => TickOutcome::Decoded(self.finish(Decoded {
                payload,
                source: DecodeSource::Camera,
            })),
            None => {
                session.pending = Some(self.scheduler.schedule());
                TickOutcome::Continue
            }
        }
    }

    fn initial_request(&self) -> CameraRequest {
        if let Some(device) = &self.config.preferred_device {
            return CameraRequest {
                facing: Facing::Any,
                device_id: Some(device.clone()),
            };
        }

        if self.config.handheld && self.config.prefer_rear_camera {
            let rear = self
                .camera
                .devices()
                .into_iter()
                .find(|d| d.facing == Facing::Environment);
            return CameraRequest {
                facing: Facing::Environment,
                device_id: rear.map(|d| d.id),
            };
        }

        CameraRequest {
            facing: Facing::Any,
            device_id: None,
        }
    }

    fn acquire(&mut self, request: CameraRequest) -> Result<(), ScannerError> {
        self.state = ScannerState::AcquiringPermission;

        match self.camera.open(&request) {
            Ok(stream) => {
                let pending = self.scheduler.schedule();
                self.session = Some(Session {
                    guard: StreamGuard::new(stream),
                    pending: Some(pending),
                    device: request.device_id,
                });
                self.state = ScannerState::Streaming;

                #[cfg(feature = "logging")]
                debug!("Camera stream open, decode loop started");

                Ok(())
            }
            Err(fault) => {
                #[cfg(feature = "logging")]
                warn!("Camera acquisition failed: {}", fault);

                self.state = ScannerState::Error(fault.clone());
                Err(ScannerError::Camera(fault))
            }
        }
    }

    /// Cancel the pending tick and release the stream. Returns whether a
    /// session was open.
    fn shutdown(&mut self) -> bool {
        let Some(mut session) = self.session.take() else {
            return false;
        };

        if let Some(tick) = session.pending.take() {
            self.scheduler.cancel(tick);
        }
        session.guard.release();

        #[cfg(feature = "logging")]
        debug!("Camera stream released");

        true
    }

    fn finish(&mut self, decoded: Decoded) -> Decoded {
        self.shutdown();
        self.state = ScannerState::Found;

        #[cfg(feature = "logging")]
        debug!("Decoded payload via {:?}", decoded.source);

        if let Some(listener) = self.listener.as_mut() {
            listener(&decoded);
        }
        decoded
    }
}

impl<C, D, S> Drop for CodeScanner<C, D, S>
where
    C: CameraProvider,
    D: CodeDecoder,
    S: FrameScheduler,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

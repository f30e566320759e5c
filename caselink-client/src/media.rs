/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Shared local media source.
//!
//! One camera/microphone pair feeds every peer link, so source mutation is
//! serialized behind a single mutex. Screen-share toggles swap the outbound
//! video track on all links inside one critical section, which keeps the
//! swap atomic with respect to renegotiations racing in from multiple
//! peers.

use crate::transport::VideoSource;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Device acquisition failed before join. The caller may still join in
/// receive-only capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAccessError {
    PermissionDenied { device: &'static str },
    DeviceUnavailable { device: &'static str },
}

impl fmt::Display for MediaAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaAccessError::PermissionDenied { device } => {
                write!(f, "permission denied for {device}")
            }
            MediaAccessError::DeviceUnavailable { device } => {
                write!(f, "no usable {device} found")
            }
        }
    }
}

impl std::error::Error for MediaAccessError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaState {
    pub mic_enabled: bool,
    pub camera_enabled: bool,
    pub video_source: VideoSource,
}

/// Handle to the platform's device layer. The embedding application
/// acquires devices and reports the outcome here before joining.
pub struct LocalMedia {
    state: Mutex<MediaState>,
    /// `None` until `acquired`/`acquisition_failed` is called.
    access: Mutex<Option<Result<(), MediaAccessError>>>,
}

impl LocalMedia {
    pub fn new() -> Self {
        LocalMedia {
            state: Mutex::new(MediaState {
                mic_enabled: true,
                camera_enabled: true,
                video_source: VideoSource::Camera,
            }),
            access: Mutex::new(None),
        }
    }

    /// Record a successful device acquisition.
    pub fn acquired(&self) {
        *self.access.lock().unwrap() = Some(Ok(()));
    }

    /// Record a failed acquisition. The error is surfaced by
    /// [`LocalMedia::check_access`] before join.
    pub fn acquisition_failed(&self, err: MediaAccessError) {
        *self.access.lock().unwrap() = Some(Err(err));
    }

    /// Must be consulted before joining a room. `Err` means the user sees
    /// the failure up front and may opt into receive-only join.
    pub fn check_access(&self) -> Result<(), MediaAccessError> {
        match *self.access.lock().unwrap() {
            Some(result) => result,
            None => Err(MediaAccessError::DeviceUnavailable { device: "media" }),
        }
    }

    pub fn is_receive_only(&self) -> bool {
        self.check_access().is_err()
    }

    pub fn state(&self) -> MediaState {
        *self.state.lock().unwrap()
    }

    pub fn set_mic_enabled(&self, enabled: bool) {
        self.state.lock().unwrap().mic_enabled = enabled;
    }

    pub fn set_camera_enabled(&self, enabled: bool) {
        self.state.lock().unwrap().camera_enabled = enabled;
    }

    /// Swap the outbound video source, running `apply` (which replaces the
    /// track on every live peer link) while the state lock is held. Returns
    /// the new source, or `None` if it already matched.
    pub fn swap_video_source<F>(&self, source: VideoSource, apply: F) -> Option<VideoSource>
    where
        F: FnOnce(&MediaState),
    {
        let mut state: MutexGuard<'_, MediaState> = self.state.lock().unwrap();
        if state.video_source == source {
            return None;
        }
        state.video_source = source;
        apply(&state);
        Some(source)
    }
}

impl Default for LocalMedia {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_must_be_established_before_join() {
        let media = LocalMedia::new();
        assert!(media.check_access().is_err());
        media.acquired();
        assert!(media.check_access().is_ok());
        assert!(!media.is_receive_only());
    }

    #[test]
    fn permission_denied_enables_receive_only() {
        let media = LocalMedia::new();
        media.acquisition_failed(MediaAccessError::PermissionDenied { device: "camera" });
        assert_eq!(
            media.check_access(),
            Err(MediaAccessError::PermissionDenied { device: "camera" })
        );
        assert!(media.is_receive_only());
    }

    #[test]
    fn swap_is_idempotent_per_source() {
        let media = LocalMedia::new();
        let mut applied = 0;
        assert_eq!(
            media.swap_video_source(VideoSource::ScreenShare, |_| applied += 1),
            Some(VideoSource::ScreenShare)
        );
        assert_eq!(
            media.swap_video_source(VideoSource::ScreenShare, |_| applied += 1),
            None
        );
        assert_eq!(applied, 1);
        assert_eq!(media.state().video_source, VideoSource::ScreenShare);
    }
}

// Recursion guard for backdrop capture.
//
// Capturing "everything beneath a region" walks the whole root surface, which
// includes the region itself and any other blur regions. A `CaptureSession`
// lives for one draw cycle and is threaded through every capture; it tracks
// how many captures are in flight and which regions are currently being
// captured, so a region's draw entry point can tell whether to stop the walk,
// skip itself, or draw normally.

use crate::host::RegionId;
use std::ops::{Deref, DerefMut};

/// What a blur region should do when the host asks it to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionDraw {
    /// This region is the one being captured: stop the traversal here.
    Abort,
    /// Another region's capture is in flight: render nothing.
    Skip,
    /// Normal paint.
    Draw,
}

#[derive(Debug, Default)]
pub struct CaptureSession {
    in_flight: usize,
    capturing: Vec<RegionId>,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_capturing(&self, region: RegionId) -> bool {
        self.capturing.contains(&region)
    }

    /// Own capture first, then any capture.
    pub fn check(&self, region: RegionId) -> RegionDraw {
        if self.is_capturing(region) {
            RegionDraw::Abort
        } else if self.in_flight > 0 {
            RegionDraw::Skip
        } else {
            RegionDraw::Draw
        }
    }

    /// Mark `region` as being captured until the returned scope drops.
    pub fn enter(&mut self, region: RegionId) -> CaptureScope<'_> {
        self.in_flight += 1;
        self.capturing.push(region);
        CaptureScope { session: self, region }
    }
}

/// Armed guard. Derefs to the session so it can be passed down the draw
/// call stack; undoes its bookkeeping on every exit path.
pub struct CaptureScope<'s> {
    session: &'s mut CaptureSession,
    region: RegionId,
}

impl Deref for CaptureScope<'_> {
    type Target = CaptureSession;

    fn deref(&self) -> &CaptureSession {
        &*self.session
    }
}

impl DerefMut for CaptureScope<'_> {
    fn deref_mut(&mut self) -> &mut CaptureSession {
        &mut *self.session
    }
}

impl Drop for CaptureScope<'_> {
    fn drop(&mut self) {
        self.session.in_flight -= 1;
        if let Some(pos) = self.session.capturing.iter().rposition(|&r| r == self.region) {
            self.session.capturing.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_session_draws_everything() {
        let session = CaptureSession::new();
        assert_eq!(session.check(RegionId(1)), RegionDraw::Draw);
    }

    #[test]
    fn captured_region_aborts_and_others_skip() {
        let mut session = CaptureSession::new();
        let scope = session.enter(RegionId(1));
        assert_eq!(scope.check(RegionId(1)), RegionDraw::Abort);
        assert_eq!(scope.check(RegionId(2)), RegionDraw::Skip);
        assert_eq!(scope.in_flight(), 1);
    }

    #[test]
    fn scope_drop_restores_session() {
        let mut session = CaptureSession::new();
        {
            let mut outer = session.enter(RegionId(1));
            let inner = outer.enter(RegionId(2));
            assert_eq!(inner.in_flight(), 2);
        }
        assert_eq!(session.in_flight(), 0);
        assert!(!session.is_capturing(RegionId(1)));
        assert_eq!(session.check(RegionId(1)), RegionDraw::Draw);
    }

    #[test]
    fn scope_is_released_on_panic() {
        let mut session = CaptureSession::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = session.enter(RegionId(7));
            panic!("draw blew up");
        }));
        assert!(result.is_err());
        assert_eq!(session.in_flight(), 0);
        assert!(!session.is_capturing(RegionId(7)));
    }
}

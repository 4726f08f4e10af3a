/// Bookkeeping for a `requestAnimationFrame` loop that has to stop cleanly.
#[derive(Debug, Default)]
pub struct FrameGate {
    pending: Option<i32>,
    stopped: bool,
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&mut self, handle: i32) {
        self.pending = Some(handle);
    }

    /// Called at the top of each frame callback. Returns `false` once the loop
    /// has been stopped, in which case the callback must not draw or reschedule.
    pub fn begin_frame(&mut self) -> bool {
        self.pending = None;
        !self.stopped
    }

    pub fn pending(&self) -> Option<i32> {
        self.pending
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Stops the loop and hands back the handle to cancel, if a frame is queued.
    pub fn stop(&mut self) -> Option<i32> {
        self.stopped = true;
        self.pending.take()
    }
}

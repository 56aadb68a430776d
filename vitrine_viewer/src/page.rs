//! Page Glue: container visibility plus the lazily constructed viewer.
//!
//! The page owns a `Lifecycle` instead of a nullable viewer. Hosts translate
//! their events (DOMContentLoaded, trigger/close clicks, scroll, resize) into
//! calls here and act on the returned `PageAction`; construction itself is
//! the host's job because it needs a window and a GPU.

use log::{info, warn};

use crate::error::InitializationError;
use crate::scene::ContainerSize;

/// What the page needs from a constructed viewer.
pub trait PageViewer {
    /// The container just became visible.
    fn open(&mut self);
    /// The container was hidden: reset the pose and release GPU resources.
    fn close(&mut self, now_ms: f64);
    /// Page scroll offset changed.
    fn scroll(&mut self, pos: f32);
    fn resize(&mut self, size: ContainerSize);
    /// One frame loop tick. Runs for the page's lifetime, shown or not.
    fn tick(&mut self, now_ms: f64);
}

pub enum Lifecycle<V> {
    Uninitialized,
    Initializing,
    Ready(V),
}

impl<V> Lifecycle<V> {
    pub fn label(&self) -> &'static str {
        match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Initializing => "initializing",
            Lifecycle::Ready(_) => "ready",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    None,
    /// The host must build a viewer and hand it to `finish_initialization`.
    Construct,
}

pub struct ViewerPage<V> {
    lifecycle: Lifecycle<V>,
    visible: bool,
    preload: bool,
    scroll_offset: f32,
    size: Option<ContainerSize>,
}

impl<V: PageViewer> ViewerPage<V> {
    /// `preload` builds the viewer on page load rather than first open.
    pub fn new(preload: bool) -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
            visible: false,
            preload,
            scroll_offset: 0.0,
            size: None,
        }
    }

    pub fn lifecycle(&self) -> &Lifecycle<V> {
        &self.lifecycle
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    pub fn viewer(&self) -> Option<&V> {
        match &self.lifecycle {
            Lifecycle::Ready(viewer) => Some(viewer),
            _ => None,
        }
    }

    pub fn viewer_mut(&mut self) -> Option<&mut V> {
        match &mut self.lifecycle {
            Lifecycle::Ready(viewer) => Some(viewer),
            _ => None,
        }
    }

    /// Visible and ready to draw.
    pub fn active_viewer(&mut self) -> Option<&mut V> {
        if self.visible {
            self.viewer_mut()
        } else {
            None
        }
    }

    pub fn content_loaded(&mut self) -> PageAction {
        if self.preload {
            self.request_construction()
        } else {
            PageAction::None
        }
    }

    /// Trigger clicked: show the container, building the viewer if this is
    /// the first time.
    pub fn open(&mut self) -> PageAction {
        self.visible = true;
        if let Lifecycle::Ready(viewer) = &mut self.lifecycle {
            viewer.open();
            return PageAction::None;
        }
        self.request_construction()
    }

    fn request_construction(&mut self) -> PageAction {
        match self.lifecycle {
            Lifecycle::Uninitialized => {
                self.lifecycle = Lifecycle::Initializing;
                PageAction::Construct
            }
            _ => PageAction::None,
        }
    }

    /// Hand over the result of a `Construct` request.
    pub fn finish_initialization(
        &mut self,
        result: Result<V, InitializationError>,
    ) -> Result<(), InitializationError> {
        if !matches!(self.lifecycle, Lifecycle::Initializing) {
            warn!(
                "[vitrine] initialization finished while {}; ignoring",
                self.lifecycle.label()
            );
            return Ok(());
        }
        match result {
            Ok(mut viewer) => {
                if let Some(size) = self.size {
                    viewer.resize(size);
                }
                if self.scroll_offset != 0.0 {
                    viewer.scroll(self.scroll_offset);
                }
                if self.visible {
                    viewer.open();
                }
                self.lifecycle = Lifecycle::Ready(viewer);
                info!("[vitrine] viewer ready");
                Ok(())
            }
            Err(err) => {
                self.lifecycle = Lifecycle::Uninitialized;
                self.visible = false;
                Err(err)
            }
        }
    }

    /// Close button clicked.
    pub fn close(&mut self, now_ms: f64) {
        if !self.visible {
            return;
        }
        self.visible = false;
        if let Some(viewer) = self.viewer_mut() {
            viewer.close(now_ms);
        }
    }

    pub fn scroll(&mut self, pos: f32) {
        self.scroll_offset = pos;
        if let Some(viewer) = self.viewer_mut() {
            viewer.scroll(pos);
        }
    }

    /// Page is going away: hand the viewer back for disposal.
    pub fn teardown(&mut self) -> Option<V> {
        self.visible = false;
        match std::mem::replace(&mut self.lifecycle, Lifecycle::Uninitialized) {
            Lifecycle::Ready(viewer) => Some(viewer),
            _ => None,
        }
    }

    /// Container size changed. Remembered so a viewer finishing
    /// construction later starts at the current size.
    pub fn resize(&mut self, size: ContainerSize) {
        self.size = Some(size);
        if let Some(viewer) = self.viewer_mut() {
            viewer.resize(size);
        }
    }

    pub fn tick(&mut self, now_ms: f64) {
        if let Some(viewer) = self.viewer_mut() {
            viewer.tick(now_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl PageViewer for Recorder {
        fn open(&mut self) {
            self.calls.push("open".into());
        }
        fn close(&mut self, now_ms: f64) {
            self.calls.push(format!("close@{now_ms}"));
        }
        fn scroll(&mut self, pos: f32) {
            self.calls.push(format!("scroll {pos}"));
        }
        fn resize(&mut self, size: ContainerSize) {
            self.calls.push(format!("resize {}x{}", size.width, size.height));
        }
        fn tick(&mut self, now_ms: f64) {
            self.calls.push(format!("tick@{now_ms}"));
        }
    }

    fn calls(page: &ViewerPage<Recorder>) -> Vec<String> {
        page.viewer().expect("ready").calls.clone()
    }

    #[test]
    fn lazy_page_constructs_exactly_once() {
        let mut page = ViewerPage::<Recorder>::new(false);
        assert_eq!(page.content_loaded(), PageAction::None);
        assert_eq!(page.open(), PageAction::Construct);
        assert_eq!(page.open(), PageAction::None);
        page.finish_initialization(Ok(Recorder::default()))
            .expect("ready");
        page.close(10.0);
        assert_eq!(page.open(), PageAction::None);
        assert_eq!(calls(&page), ["open", "close@10", "open"]);
    }

    #[test]
    fn preload_builds_on_content_loaded() {
        let mut page = ViewerPage::<Recorder>::new(true);
        assert_eq!(page.content_loaded(), PageAction::Construct);
        assert_eq!(page.content_loaded(), PageAction::None);
        page.finish_initialization(Ok(Recorder::default()))
            .expect("ready");
        assert!(!page.is_visible());
        assert_eq!(page.open(), PageAction::None);
        assert!(page.is_visible());
    }

    #[test]
    fn failed_initialization_allows_retry() {
        let mut page = ViewerPage::<Recorder>::new(false);
        assert_eq!(page.open(), PageAction::Construct);
        let err = page
            .finish_initialization(Err(InitializationError::MissingElement("model")))
            .expect_err("error passes through");
        assert!(matches!(err, InitializationError::MissingElement("model")));
        assert_eq!(page.lifecycle().label(), "uninitialized");
        assert!(!page.is_visible());
        assert_eq!(page.open(), PageAction::Construct);
    }

    #[test]
    fn close_is_ignored_when_hidden() {
        let mut page = ViewerPage::<Recorder>::new(true);
        page.content_loaded();
        page.finish_initialization(Ok(Recorder::default()))
            .expect("ready");
        page.close(5.0);
        assert!(calls(&page).is_empty());
    }

    #[test]
    fn events_before_ready_are_replayed() {
        let mut page = ViewerPage::<Recorder>::new(false);
        page.scroll(120.0);
        page.resize(ContainerSize::new(320, 240));
        page.resize(ContainerSize::new(640, 480));
        assert_eq!(page.open(), PageAction::Construct);
        page.finish_initialization(Ok(Recorder::default()))
            .expect("ready");
        assert_eq!(calls(&page), ["resize 640x480", "scroll 120", "open"]);
        assert!(page.active_viewer().is_some());
    }

    #[test]
    fn frame_loop_runs_while_hidden() {
        let mut page = ViewerPage::<Recorder>::new(true);
        page.tick(1.0);
        page.content_loaded();
        page.finish_initialization(Ok(Recorder::default()))
            .expect("ready");
        page.tick(2.0);
        page.open();
        page.tick(3.0);
        page.close(4.0);
        page.tick(5.0);
        assert_eq!(calls(&page), ["tick@2", "open", "tick@3", "close@4", "tick@5"]);
    }

    #[test]
    fn teardown_returns_ready_viewer_once() {
        let mut page = ViewerPage::<Recorder>::new(true);
        page.content_loaded();
        page.finish_initialization(Ok(Recorder::default()))
            .expect("ready");
        page.open();
        assert!(page.teardown().is_some());
        assert!(page.teardown().is_none());
        assert!(!page.is_visible());
    }
}

// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Owning handle for an orchestrator running in the browser.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use web_sys::{Element, MediaQueryList, MediaQueryListEvent};

use unveil_core::config::{ConfigError, OrchestratorConfig};
use unveil_core::orchestrator::{LifecycleError, Mode, Orchestrator, Phase};

use crate::dom::read_key;
use crate::platform::{Handle, REDUCED_MOTION_QUERY, WebPlatform, dispatch};

/// Owns an [`Orchestrator`] on a [`WebPlatform`].
///
/// Observer, timer and image callbacks hold only weak references, so
/// dropping the handle tears the orchestrator down.
///
/// ```rust,ignore
/// let root = document.query_selector("main")?.unwrap();
/// let config = OrchestratorConfig::new(vec![
///     Selector::reveal(".card"),
///     Selector::lazy("img[data-src]"),
/// ]);
/// let mut unveil = Unveil::new(root, config)?;
/// unveil.initialize()?;
/// ```
pub struct Unveil {
    inner: Rc<RefCell<Orchestrator<WebPlatform>>>,
    media: Option<MediaListener>,
}

impl Unveil {
    /// Creates an orchestrator for the subtree under `root`.
    ///
    /// # Errors
    ///
    /// Propagates configuration validation failures.
    pub fn new(root: Element, config: OrchestratorConfig) -> Result<Self, ConfigError> {
        Self::with_platform(config, WebPlatform::new(root))
    }

    /// Creates an orchestrator on an already configured platform.
    ///
    /// # Errors
    ///
    /// Propagates configuration validation failures.
    pub fn with_platform(
        config: OrchestratorConfig,
        platform: WebPlatform,
    ) -> Result<Self, ConfigError> {
        let inner = Rc::new(RefCell::new(Orchestrator::new(config, platform)?));
        inner.borrow_mut().platform_mut().bind(Rc::downgrade(&inner));
        Ok(Self { inner, media: None })
    }

    /// Connects observers, registers the current matches and starts
    /// following the reduced-motion media query.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] unless this is the first call.
    pub fn initialize(&mut self) -> Result<(), LifecycleError> {
        let respect = {
            let mut orchestrator = self.inner.borrow_mut();
            orchestrator.initialize()?;
            orchestrator.config().respect_reduced_motion
        };
        if respect {
            self.media = MediaListener::install(Rc::downgrade(&self.inner));
        }
        Ok(())
    }

    /// Registers matching nodes added since the last scan.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] unless the orchestrator is active.
    pub fn refresh(&self) -> Result<usize, LifecycleError> {
        self.inner.borrow_mut().refresh()
    }

    /// Lets an errored node load again.
    ///
    /// Returns `Ok(false)` for nodes this handle never tracked.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] unless the orchestrator is active.
    pub fn reset_element(&self, element: &Element) -> Result<bool, LifecycleError> {
        let Some(key) = read_key(element) else {
            return Ok(false);
        };
        self.inner.borrow_mut().reset_element(key)
    }

    /// Stops everything and releases all browser resources. Applied classes
    /// and promoted sources stay on the nodes.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] if the orchestrator was never initialized
    /// or is already destroyed.
    pub fn destroy(&mut self) -> Result<(), LifecycleError> {
        if let Some(media) = self.media.take() {
            media.remove();
        }
        let mut orchestrator = self.inner.borrow_mut();
        orchestrator.destroy()?;
        orchestrator.platform_mut().release();
        Ok(())
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.borrow().phase()
    }

    /// Current reveal mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.inner.borrow().mode()
    }

    /// Runs `f` with shared access to the orchestrator.
    pub fn with_orchestrator<R>(&self, f: impl FnOnce(&Orchestrator<WebPlatform>) -> R) -> R {
        f(&self.inner.borrow())
    }
}

impl Drop for Unveil {
    fn drop(&mut self) {
        if matches!(self.phase(), Phase::Active | Phase::Initializing) {
            let _ = self.destroy();
        }
    }
}

impl fmt::Debug for Unveil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unveil")
            .field("phase", &self.phase())
            .field("mode", &self.mode())
            .field("media", &self.media.is_some())
            .finish_non_exhaustive()
    }
}

/// `change` listener on the reduced-motion media query.
struct MediaListener {
    list: MediaQueryList,
    callback: Closure<dyn FnMut(MediaQueryListEvent)>,
}

impl MediaListener {
    fn install(handle: Handle) -> Option<Self> {
        let list = web_sys::window()?
            .match_media(REDUCED_MOTION_QUERY)
            .ok()??;
        let callback = Closure::wrap(Box::new(move |event: MediaQueryListEvent| {
            dispatch(&handle, |orchestrator| {
                orchestrator.set_reduced_motion(event.matches());
            });
        }) as Box<dyn FnMut(MediaQueryListEvent)>);
        list.add_event_listener_with_callback("change", callback.as_ref().unchecked_ref())
            .ok()?;
        Some(Self { list, callback })
    }

    fn remove(self) {
        let _ = self
            .list
            .remove_event_listener_with_callback("change", self.callback.as_ref().unchecked_ref());
    }
}

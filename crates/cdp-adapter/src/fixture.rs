//! Scriptable in-memory driver.
//!
//! Elements are registered with the exact locator expressions that should
//! find them, scoped to a frame and optionally nested under a parent. Scoped
//! lookups search descendants, except that `./ancestor..`/`./parent::..`
//! expressions walk up the parent chain and `./following-sibling..` ones
//! search elements sharing the scope's parent. Click
//! and wheel hooks mutate the state so tests can model page reactions
//! (a listbox opening, a radio flipping, an export writing a file).

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::{
    error::{DriverError, DriverErrorKind},
    locator::{ClickMethod, ElementRef, FrameTarget, Locator},
    Driver,
};

pub type ClickHook = Arc<dyn Fn(&mut FixtureState, ClickMethod) + Send + Sync>;
pub type WheelHook = Arc<dyn Fn(&mut FixtureState, f64) + Send + Sync>;
pub type ScriptHook = Arc<dyn Fn(&mut FixtureState, &str, &[ElementRef]) -> Value + Send + Sync>;
pub type NavigateHook = Arc<dyn Fn(&mut FixtureState, &str) + Send + Sync>;

/// Declarative description of one fixture element.
#[derive(Debug, Clone, Default)]
pub struct ElementSpec {
    key: String,
    frame: Option<String>,
    locators: Vec<String>,
    parent: Option<String>,
    attrs: HashMap<String, String>,
    text: String,
    hidden: bool,
    disabled: bool,
    detached: bool,
}

impl ElementSpec {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn locator(mut self, expr: impl Into<String>) -> Self {
        self.locators.push(expr.into());
        self
    }

    pub fn frame(mut self, name: impl Into<String>) -> Self {
        self.frame = Some(name.into());
        self
    }

    pub fn parent(mut self, key: impl Into<String>) -> Self {
        self.parent = Some(key.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Registered but not in the document until [`FixtureState::attach`].
    pub fn detached(mut self) -> Self {
        self.detached = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FixtureElement {
    pub key: String,
    pub frame: FrameTarget,
    pub locators: Vec<String>,
    pub parent: Option<String>,
    pub attrs: HashMap<String, String>,
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
    pub present: bool,
    generation: u32,
}

impl FixtureElement {
    fn handle(&self) -> ElementRef {
        ElementRef::new(format!("{}#{}", self.key, self.generation), self.frame.clone())
    }
}

/// Mutable page model shared by the driver and its hooks.
#[derive(Default)]
pub struct FixtureState {
    elements: Vec<FixtureElement>,
    frames: HashSet<String>,
    current: FrameTarget,
    calls: Vec<String>,
    dialog_pending: bool,
    click_hooks: HashMap<String, ClickHook>,
    wheel_hooks: HashMap<String, WheelHook>,
    script_hook: Option<ScriptHook>,
    navigate_hook: Option<NavigateHook>,
    failing_clicks: HashMap<String, u32>,
    rejected_methods: HashMap<String, HashSet<ClickMethod>>,
    page_source: String,
    closed: bool,
}

impl FixtureState {
    pub fn add(&mut self, spec: ElementSpec) {
        let element = FixtureElement {
            key: spec.key.clone(),
            frame: spec
                .frame
                .map(FrameTarget::Named)
                .unwrap_or(FrameTarget::Root),
            locators: spec.locators,
            parent: spec.parent,
            attrs: spec.attrs,
            text: spec.text,
            visible: !spec.hidden,
            enabled: !spec.disabled,
            present: !spec.detached,
            generation: 0,
        };
        self.elements.retain(|existing| existing.key != spec.key);
        self.elements.push(element);
    }

    pub fn add_frame(&mut self, name: impl Into<String>) {
        self.frames.insert(name.into());
    }

    pub fn remove_frame(&mut self, name: &str) {
        self.frames.remove(name);
    }

    pub fn element(&self, key: &str) -> Option<&FixtureElement> {
        self.elements.iter().find(|el| el.key == key)
    }

    pub fn element_mut(&mut self, key: &str) -> Option<&mut FixtureElement> {
        self.elements.iter_mut().find(|el| el.key == key)
    }

    pub fn set_attr(&mut self, key: &str, name: &str, value: impl Into<String>) {
        if let Some(el) = self.element_mut(key) {
            el.attrs.insert(name.to_string(), value.into());
        }
    }

    pub fn remove_attr(&mut self, key: &str, name: &str) {
        if let Some(el) = self.element_mut(key) {
            el.attrs.remove(name);
        }
    }

    pub fn attr(&self, key: &str, name: &str) -> Option<String> {
        self.element(key).and_then(|el| el.attrs.get(name).cloned())
    }

    pub fn set_text(&mut self, key: &str, text: impl Into<String>) {
        if let Some(el) = self.element_mut(key) {
            el.text = text.into();
        }
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.element(key).map(|el| el.text.clone())
    }

    pub fn set_visible(&mut self, key: &str, visible: bool) {
        if let Some(el) = self.element_mut(key) {
            el.visible = visible;
        }
    }

    pub fn set_enabled(&mut self, key: &str, enabled: bool) {
        if let Some(el) = self.element_mut(key) {
            el.enabled = enabled;
        }
    }

    /// Remove from the document; existing handles become stale.
    pub fn detach(&mut self, key: &str) {
        if let Some(el) = self.element_mut(key) {
            el.present = false;
        }
    }

    /// Insert into the document as a fresh node.
    pub fn attach(&mut self, key: &str) {
        if let Some(el) = self.element_mut(key) {
            if !el.present {
                el.present = true;
                el.generation += 1;
            }
        }
    }

    pub fn is_present(&self, key: &str) -> bool {
        self.element(key).map(|el| el.present).unwrap_or(false)
    }

    pub fn current_frame(&self) -> &FrameTarget {
        &self.current
    }

    pub fn raise_dialog(&mut self) {
        self.dialog_pending = true;
    }

    pub fn set_page_source(&mut self, source: impl Into<String>) {
        self.page_source = source.into();
    }

    fn record(&mut self, entry: String) {
        self.calls.push(entry);
    }

    fn live(&self, handle: &ElementRef) -> Result<&FixtureElement, DriverError> {
        self.elements
            .iter()
            .find(|el| el.present && el.handle() == *handle)
            .ok_or_else(|| {
                DriverError::new(DriverErrorKind::StaleElement)
                    .with_hint(format!("element {handle} no longer attached"))
            })
    }

    fn ancestors(&self, key: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut cursor = self.element(key).and_then(|el| el.parent.clone());
        while let Some(parent) = cursor {
            if chain.contains(&parent) || chain.len() > 64 {
                break;
            }
            cursor = self.element(&parent).and_then(|el| el.parent.clone());
            chain.push(parent);
        }
        chain
    }

    fn descends_from(&self, key: &str, ancestor: &str) -> bool {
        let mut cursor = self.element(key).and_then(|el| el.parent.clone());
        let mut guard = 0;
        while let Some(parent) = cursor {
            if parent == ancestor {
                return true;
            }
            guard += 1;
            if guard > 64 {
                return false;
            }
            cursor = self.element(&parent).and_then(|el| el.parent.clone());
        }
        false
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::new(DriverErrorKind::Closed));
        }
        Ok(())
    }
}

/// [`Driver`] over a shared [`FixtureState`]. Clones share the same page.
#[derive(Clone, Default)]
pub struct FixtureDriver {
    state: Arc<Mutex<FixtureState>>,
}

impl FixtureDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut FixtureState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn add(&self, spec: ElementSpec) -> &Self {
        self.state.lock().add(spec);
        self
    }

    pub fn add_frame(&self, name: impl Into<String>) -> &Self {
        self.state.lock().add_frame(name);
        self
    }

    pub fn on_click<F>(&self, key: impl Into<String>, hook: F) -> &Self
    where
        F: Fn(&mut FixtureState, ClickMethod) + Send + Sync + 'static,
    {
        self.state.lock().click_hooks.insert(key.into(), Arc::new(hook));
        self
    }

    pub fn on_wheel<F>(&self, key: impl Into<String>, hook: F) -> &Self
    where
        F: Fn(&mut FixtureState, f64) + Send + Sync + 'static,
    {
        self.state.lock().wheel_hooks.insert(key.into(), Arc::new(hook));
        self
    }

    pub fn on_script<F>(&self, hook: F) -> &Self
    where
        F: Fn(&mut FixtureState, &str, &[ElementRef]) -> Value + Send + Sync + 'static,
    {
        self.state.lock().script_hook = Some(Arc::new(hook));
        self
    }

    pub fn on_navigate<F>(&self, hook: F) -> &Self
    where
        F: Fn(&mut FixtureState, &str) + Send + Sync + 'static,
    {
        self.state.lock().navigate_hook = Some(Arc::new(hook));
        self
    }

    /// The next `count` clicks on `key` fail as not interactable.
    pub fn fail_clicks(&self, key: impl Into<String>, count: u32) -> &Self {
        self.state.lock().failing_clicks.insert(key.into(), count);
        self
    }

    /// Clicks on `key` delivered with `method` always fail.
    pub fn reject_method(&self, key: impl Into<String>, method: ClickMethod) -> &Self {
        self.state
            .lock()
            .rejected_methods
            .entry(key.into())
            .or_default()
            .insert(method);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn click_count(&self, key: &str) -> usize {
        let prefix = format!("click {key}#");
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.starts_with(&prefix))
            .count()
    }

    /// Position of the first lookup of `expr` in the call log.
    pub fn first_lookup(&self, expr: &str) -> Option<usize> {
        let needle = format!("find {expr}");
        self.state.lock().calls.iter().position(|call| *call == needle)
    }

    pub fn attr(&self, key: &str, name: &str) -> Option<String> {
        self.state.lock().attr(key, name)
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.state.lock().text(key)
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn matches(
        state: &FixtureState,
        frame: &FrameTarget,
        locator: &Locator,
        scope: Option<&str>,
    ) -> Vec<ElementRef> {
        let carries = |el: &FixtureElement| {
            el.present && el.frame == *frame && el.locators.iter().any(|expr| *expr == locator.expr)
        };
        let Some(scope) = scope else {
            return state
                .elements
                .iter()
                .filter(|el| carries(*el))
                .map(FixtureElement::handle)
                .collect();
        };
        let expr = locator.expr.trim_start();
        if expr.starts_with("./ancestor") || expr.starts_with("./parent::") {
            // Nearest ancestor first.
            return state
                .ancestors(scope)
                .iter()
                .filter_map(|key| state.element(key))
                .filter(|el| carries(*el))
                .map(FixtureElement::handle)
                .collect();
        }
        if expr.starts_with("./following-sibling") || expr.starts_with("./preceding-sibling") {
            let parent = state.element(scope).and_then(|el| el.parent.clone());
            return state
                .elements
                .iter()
                .filter(|el| el.key != scope && el.parent.is_some() && el.parent == parent)
                .filter(|el| carries(*el))
                .map(FixtureElement::handle)
                .collect();
        }
        state
            .elements
            .iter()
            .filter(|el| carries(*el) && state.descends_from(&el.key, scope))
            .map(FixtureElement::handle)
            .collect()
    }
}

#[async_trait]
impl Driver for FixtureDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.record(format!("navigate {url}"));
        state.current = FrameTarget::Root;
        if let Some(hook) = state.navigate_hook.clone() {
            hook(&mut *state, url);
        }
        Ok(())
    }

    async fn switch_to_frame(&self, target: &FrameTarget) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.record(format!("switch {target}"));
        if let FrameTarget::Named(name) = target {
            if !state.frames.contains(name) {
                return Err(DriverError::new(DriverErrorKind::FrameNotFound).with_hint(name.clone()));
            }
        }
        state.current = target.clone();
        Ok(())
    }

    async fn current_frame(&self) -> FrameTarget {
        self.state.lock().current.clone()
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementRef>, DriverError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.record(format!("find {}", locator.expr));
        let frame = state.current.clone();
        Ok(Self::matches(&state, &frame, locator, None))
    }

    async fn find_within(
        &self,
        scope: &ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, DriverError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.record(format!("find_within {} {}", scope.id, locator.expr));
        let key = state.live(scope)?.key.clone();
        Ok(Self::matches(&state, &scope.frame, locator, Some(&key)))
    }

    async fn click(&self, element: &ElementRef, method: ClickMethod) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.record(format!("click {} {}", element.id, method.name()));
        let (key, visible) = {
            let el = state.live(element)?;
            (el.key.clone(), el.visible)
        };
        if method != ClickMethod::Synthetic && !visible {
            return Err(DriverError::new(DriverErrorKind::NotInteractable)
                .with_hint(format!("{key} is not visible")));
        }
        if state
            .rejected_methods
            .get(&key)
            .is_some_and(|methods| methods.contains(&method))
        {
            return Err(DriverError::new(DriverErrorKind::NotInteractable)
                .with_hint(format!("{key} rejects {} clicks", method.name())));
        }
        if let Some(remaining) = state.failing_clicks.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DriverError::new(DriverErrorKind::NotInteractable)
                    .with_hint(format!("{key} click intercepted")));
            }
        }
        if let Some(hook) = state.click_hooks.get(&key).cloned() {
            hook(&mut *state, method);
        }
        Ok(())
    }

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.live(element)?.attrs.get(name).cloned())
    }

    async fn text(&self, element: &ElementRef) -> Result<String, DriverError> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.live(element)?.text.trim().to_string())
    }

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool, DriverError> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.live(element)?.visible)
    }

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool, DriverError> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.live(element)?.enabled)
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.live(element)?;
        state.record(format!("scroll {}", element.id));
        Ok(())
    }

    async fn wheel(&self, element: &ElementRef, delta_y: f64) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        let key = state.live(element)?.key.clone();
        state.record(format!("wheel {} {delta_y}", element.id));
        if let Some(hook) = state.wheel_hooks.get(&key).cloned() {
            hook(&mut *state, delta_y);
        }
        Ok(())
    }

    async fn execute_script(&self, script: &str, args: &[ElementRef]) -> Result<Value, DriverError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        for arg in args {
            state.live(arg)?;
        }
        state.record(format!("script {}", script.trim()));
        match state.script_hook.clone() {
            Some(hook) => Ok(hook(&mut *state, script, args)),
            None => Ok(Value::Null),
        }
    }

    async fn accept_dialog(&self) -> Result<bool, DriverError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        let pending = std::mem::take(&mut state.dialog_pending);
        if pending {
            state.record("dialog accepted".to_string());
        }
        Ok(pending)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.record("screenshot".to_string());
        Ok(b"\x89PNG fixture".to_vec())
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.page_source.clone())
    }

    async fn close(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.record("close".to_string());
        state.closed = true;
        Ok(())
    }
}

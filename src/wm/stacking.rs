//! Stacking Module
//!
//! Window z-order grouped by layer. The order is kept bottom to top; a
//! window always sits above every window of a lower layer.

use std::cmp::Ordering;
use tracing::debug;

use crate::wm::client_flags::WindowLayer;
use crate::wm::error::trap;
use crate::wm::WindowManagerCore;

#[derive(Debug, Default)]
pub struct StackingOrder {
    /// Client ids with their layer, bottom to top
    entries: Vec<(u32, WindowLayer)>,
}

impl StackingOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self, window: u32) -> Option<usize> {
        self.entries.iter().position(|(w, _)| *w == window)
    }

    pub fn layer_of(&self, window: u32) -> Option<WindowLayer> {
        self.entries.iter().find(|(w, _)| *w == window).map(|(_, l)| *l)
    }

    /// Index just above the topmost window of `layer` or below
    fn top_of_layer(&self, layer: WindowLayer) -> usize {
        self.entries.iter().rposition(|(_, l)| *l <= layer).map(|i| i + 1).unwrap_or(0)
    }

    /// Index of the bottommost window of `layer` or above
    fn bottom_of_layer(&self, layer: WindowLayer) -> usize {
        self.entries.iter().position(|(_, l)| *l >= layer).unwrap_or(self.entries.len())
    }

    /// Add on top of its layer
    pub fn insert(&mut self, window: u32, layer: WindowLayer) {
        self.remove(window);
        let index = self.top_of_layer(layer);
        self.entries.insert(index, (window, layer));
    }

    pub fn remove(&mut self, window: u32) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(w, _)| *w != window);
        before != self.entries.len()
    }

    pub fn raise(&mut self, window: u32) {
        if let Some(layer) = self.layer_of(window) {
            self.insert(window, layer);
        }
    }

    pub fn lower(&mut self, window: u32) {
        if let Some(layer) = self.layer_of(window) {
            self.remove(window);
            let index = self.bottom_of_layer(layer);
            self.entries.insert(index, (window, layer));
        }
    }

    /// Move to a new layer, on top of it; returns true if the layer changed
    pub fn set_layer(&mut self, window: u32, layer: WindowLayer) -> bool {
        match self.layer_of(window) {
            Some(current) if current != layer => {
                self.insert(window, layer);
                true
            }
            _ => false,
        }
    }

    /// Put `window` directly under `sibling` if both share a layer
    pub fn stack_just_below(&mut self, window: u32, sibling: u32) -> bool {
        let (Some(layer), Some(sibling_layer)) = (self.layer_of(window), self.layer_of(sibling))
        else {
            return false;
        };
        if layer != sibling_layer || window == sibling {
            return false;
        }
        self.remove(window);
        let index = self.position(sibling).unwrap_or(0);
        self.entries.insert(index, (window, layer));
        true
    }

    /// Total order matching the stack: lower windows compare less
    ///
    /// Unknown windows sort below everything.
    pub fn windows_cmp(&self, a: u32, b: u32) -> Ordering {
        let rank = |w| self.position(w).map(|i| i as i64).unwrap_or(-1);
        rank(a).cmp(&rank(b)).then(a.cmp(&b))
    }

    pub fn bottom_to_top(&self) -> impl DoubleEndedIterator<Item = u32> + '_ {
        self.entries.iter().map(|(w, _)| *w)
    }

    pub fn top_to_bottom(&self) -> impl Iterator<Item = u32> + '_ {
        self.bottom_to_top().rev()
    }
}

impl WindowManagerCore {
    /// Push the stack to the server and refresh the client lists
    pub(crate) fn sync_stack(&mut self) {
        let toplevels: Vec<u32> = self
            .stack
            .bottom_to_top()
            .filter_map(|w| self.windows.get(&w).map(|win| win.toplevel()))
            .collect();
        trap(self.display.restack(&toplevels), "restack", 0);

        let mut clients: Vec<u32> = self.windows.keys().copied().collect();
        clients.sort_unstable();
        let stacking: Vec<u32> = self.stack.bottom_to_top().collect();
        trap(self.display.set_client_list(&clients, &stacking), "client list", 0);
    }

    pub fn raise_window(&mut self, window: u32) {
        if self.stack.position(window).is_some() {
            debug!("Raising 0x{:x}", window);
            self.stack.raise(window);
            self.sync_stack();
        }
    }

    pub fn lower_window(&mut self, window: u32) {
        if self.stack.position(window).is_some() {
            debug!("Lowering 0x{:x}", window);
            self.stack.lower(window);
            self.sync_stack();
        }
    }

    pub fn stack_just_below(&mut self, window: u32, sibling: u32) {
        if self.stack.stack_just_below(window, sibling) {
            debug!("Stacking 0x{:x} just below 0x{:x}", window, sibling);
            self.sync_stack();
        }
    }

    /// Re-derive the layer after a state change
    pub(crate) fn update_layer(&mut self, window: u32) {
        let Some(layer) = self.windows.get(&window).map(|w| w.layer()) else {
            return;
        };
        if self.stack.set_layer(window, layer) {
            debug!("0x{:x} moved to layer {:?}", window, layer);
            self.sync_stack();
        }
    }
}

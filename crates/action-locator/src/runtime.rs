use action_primitives::{FrameTracker, Pacer};
use cdp_adapter::Driver;

use crate::{
    diagnostics::DiagnosticSink,
    resolver::{ElementResolver, ResolveOptions},
};

/// Borrowed collaborators shared by the widget drivers and the sequencers
/// built on top of them.
#[derive(Clone, Copy)]
pub struct RuntimeDeps<'a> {
    pub driver: &'a dyn Driver,
    pub pacer: &'a Pacer,
    pub frames: &'a FrameTracker,
    pub diagnostics: &'a dyn DiagnosticSink,
    /// Default options for resolving page elements.
    pub element: ResolveOptions,
}

impl<'a> RuntimeDeps<'a> {
    pub fn resolver(&self) -> ElementResolver<'a> {
        ElementResolver::new(self.driver, self.pacer, self.diagnostics)
    }
}

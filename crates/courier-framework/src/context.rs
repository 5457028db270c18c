//! Context type matching.
//!
//! A handler declares the context type it accepts. [`ContextView`] answers
//! whether the runtime context of a message can be viewed as that type:
//! a concrete context type accepts only itself, while `dyn MessageContext`
//! accepts every context.

use courier_core::MessageContext;

/// A context type a handler can be declared over.
pub trait ContextView: Send + Sync + 'static {
    /// Views `context` as `Self`, if its runtime type allows it.
    fn view(context: &dyn MessageContext) -> Option<&Self>;

    /// Name used in diagnostics.
    fn view_name() -> &'static str;
}

impl<T: MessageContext> ContextView for T {
    fn view(context: &dyn MessageContext) -> Option<&Self> {
        context.as_any().downcast_ref::<T>()
    }

    fn view_name() -> &'static str {
        std::any::type_name::<T>()
    }
}

impl ContextView for dyn MessageContext {
    fn view(context: &dyn MessageContext) -> Option<&Self> {
        Some(context)
    }

    fn view_name() -> &'static str {
        "dyn MessageContext"
    }
}

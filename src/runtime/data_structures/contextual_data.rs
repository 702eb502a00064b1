/// This trait is used to mark and release contexts of named data.  When a context is released all
/// of the data added to it is released as well.
///
/// Contexts act as a stack.  When a new context is marked it is pushed onto the stack.  When it's
/// released it is popped off and freed.  Lookups see every context at once, innermost first, so
/// the contexts act as a single view where newer names shadow older ones.
pub trait ContextualData {
    /// Mark a new context.  Any data added to the context after this point will be released when
    /// the corresponding release_context is called.
    fn mark_context(&mut self);

    /// Release the current context.  All data added to the context since the last mark will be
    /// released.
    fn release_context(&mut self);
}

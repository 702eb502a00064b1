use crate::runtime::error::{self, ErrorKind, ScriptError};

/// What kind of construct pushed a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// The body of a WHILE, DO or FOR.  BREAK and CONTINUE are legal directly inside one.
    Loop,

    /// The body of an invoked function.  RETURN is legal anywhere inside one.
    Function,
}

/// Control bookkeeping for one activation of a loop or function body.  Frames hold no variables,
/// the enclosing frame is simply the one below in the stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    kind: FrameKind,
}

impl Frame {
    /// What pushed this frame.
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Is this frame the body of a loop?
    pub fn is_loop(&self) -> bool {
        self.kind == FrameKind::Loop
    }
}

/// A request to stop executing the current body early.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unwind {
    /// Leave the innermost loop.
    Break,

    /// Skip to the next iteration of the innermost loop.
    Continue,

    /// Leave the innermost function, passing through any loops inside it.
    Return,
}

/// The observable state of the loop machinery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlState {
    /// No loop is running.
    Idle,

    /// At least one loop frame is active.
    InLoop,

    /// A BREAK was issued and the innermost loop has not consumed it yet.
    BreakRequested,
}

/// The stack of active loop and function frames plus any pending unwind request.
#[derive(Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
    unwind: Option<Unwind>,
}

impl FrameStack {
    /// Create an empty frame stack.
    pub fn new() -> FrameStack {
        FrameStack::default()
    }

    /// Push a frame, returning the depth before the push.  The caller hands that depth back to
    /// `pop_to` on every way out of the construct.
    pub fn push(&mut self, kind: FrameKind) -> usize {
        let depth = self.frames.len();

        self.frames.push(Frame { kind });
        depth
    }

    /// Pop back down to a depth previously returned by `push`.
    pub fn pop_to(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    /// The number of active frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The innermost frame.
    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Is the innermost frame a loop body?
    pub fn in_loop(&self) -> bool {
        self.top().is_some_and(Frame::is_loop)
    }

    /// Is any function body active?
    pub fn in_function(&self) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.kind == FrameKind::Function)
    }

    /// Ask the enclosing construct to stop early.  BREAK and CONTINUE need a loop as the
    /// innermost frame, so a function body never breaks out of its caller's loop.  RETURN needs a
    /// function somewhere below.
    pub fn request(&mut self, unwind: Unwind) -> error::Result<()> {
        let legal = match unwind {
            Unwind::Break | Unwind::Continue => self.in_loop(),
            Unwind::Return => self.in_function(),
        };

        if !legal {
            let message = match unwind {
                Unwind::Break => "BREAK outside of a loop body.",
                Unwind::Continue => "CONTINUE outside of a loop body.",
                Unwind::Return => "RETURN outside of a function body.",
            };

            return ScriptError::new(ErrorKind::Structure, message).into_result();
        }

        self.unwind = Some(unwind);
        Ok(())
    }

    /// The unwind request waiting to be consumed, if any.
    pub fn pending(&self) -> Option<Unwind> {
        self.unwind
    }

    /// Consume the pending request if it is the given one.
    pub fn consume(&mut self, unwind: Unwind) -> bool {
        if self.unwind == Some(unwind) {
            self.unwind = None;
            return true;
        }

        false
    }

    /// Drop any pending request and all frames.  Used before each top level line so an abandoned
    /// execution can't leak state into the next one.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.unwind = None;
    }

    /// Where the loop machinery stands.
    pub fn state(&self) -> ControlState {
        if self.unwind == Some(Unwind::Break) {
            ControlState::BreakRequested
        } else if self.frames.iter().any(Frame::is_loop) {
            ControlState::InLoop
        } else {
            ControlState::Idle
        }
    }
}

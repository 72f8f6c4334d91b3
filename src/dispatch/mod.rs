//! Keyboard event dispatch
//!
//! Decides for every system key event whether the engine acts on it and
//! whether the OS still gets to see it.

mod dispatcher;

pub use dispatcher::InputDispatcher;

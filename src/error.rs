use thiserror::Error;

/// Returned by `push` when every usable slot holds unread data.
///
/// The rejected value is handed back unchanged.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("queue is full")]
pub struct PushError<T>(pub T);

impl<T> PushError<T> {
   /// Recover the value that could not be enqueued.
   pub fn into_inner(self) -> T {
      self.0
   }
}

/// Returned by `pop` when there is no committed element to claim.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("queue is empty")]
pub struct PopError;

use thiserror::Error;

/// Errors returned by class configuration operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A class with this handle already exists.
    #[error("class handle {0:#x} already exists")]
    Exists(u32),
    /// No class with this handle.
    #[error("no class with handle {0:#x}")]
    NotFound(u32),
    /// A parentless (root) class already exists.
    #[error("a root class already exists")]
    RootExists,
    /// The class table reached its maximum size.
    #[error("class table is full ({0} classes)")]
    TableFull(usize),
    /// The class still has children and cannot be destroyed.
    #[error("class handle {0:#x} still has children")]
    Busy(u32),
}

/// Outcome of an enqueue that could not accept the packet.
///
/// A tail drop is an expected event under load, not a configuration error:
/// it is tracked in the class's drop counter and the packet is discarded.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// The class queue is at its limit; the packet was dropped and counted.
    #[error("queue limit reached, packet dropped")]
    QueueFull,
    /// No class matched the tag and no default class is configured.
    #[error("no matching class and no default class")]
    NoClass,
}

//! Session-layer errors (`spec.md` §7)
//!
//! Protocol and precondition errors never tear down a connection — the
//! router turns them into an `error{message}` unicast to the sender. Only
//! `RouterError::Fatal` (reserved for conditions the spec doesn't actually
//! reach during normal routing) would propagate past the dispatch loop.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("You are not invited to this room")]
    NotInvited,

    #[error("Incorrect password")]
    WrongPassword,

    #[error("Room is full")]
    RoomFull,

    #[error("Set a username first")]
    UsernameNotSet,

    #[error("Join a room first")]
    NotInRoom,
}

impl RouterError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

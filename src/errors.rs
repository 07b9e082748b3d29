//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`MarionetteError`] covers synchronous API misuse:
//! bad animation indices, lookups by unknown name, and attachment
//! preconditions that cannot be satisfied. Asynchronous loader failures are
//! never surfaced here; they travel as error strings on the avatar event
//! channel (see [`crate::avatar::AvatarEvents`]).
//!
//! # Usage
//!
//! Public APIs that can reject a call return [`Result<T>`], an alias for
//! `std::result::Result<T, MarionetteError>`.

use thiserror::Error;

/// The main error type for the Marionette engine.
///
/// Each variant is a precondition violation reported at the call site and
/// fatal to that call only; avatar playback state is never left half-mutated
/// by a rejected call.
#[derive(Error, Debug)]
pub enum MarionetteError {
    /// An animation index outside `[0, count)` was passed to `start` or
    /// `animate`.
    #[error("Animation index out of bounds: {index} (count: {count})")]
    AnimationIndexOutOfBounds {
        /// The invalid index
        index: usize,
        /// Number of animations owned by the avatar
        count: usize,
    },

    /// No animation with the given name is registered on the avatar.
    #[error("Animation not found: {0}")]
    AnimationNotFound(String),

    /// A model cannot be attached because the avatar has no skeleton yet.
    #[error("Cannot attach model to avatar - there is no skeleton")]
    NoSkeleton,

    /// The named bone does not exist in the avatar skeleton.
    #[error("{0} is not a bone in the avatar skeleton")]
    BoneNotFound(String),

    /// The named bone exists but has no scene node to attach to.
    #[error("{0} does not have a bone node in the avatar skeleton")]
    BoneNotAttached(String),

    /// A bone-map string could not be parsed.
    #[error("Bone map parse error: {0}")]
    BoneMapParse(String),
}

/// Alias for `Result<T, MarionetteError>`.
pub type Result<T> = std::result::Result<T, MarionetteError>;

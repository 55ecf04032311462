//! Side-effecting collaborators behind trait seams.

pub mod prompt;
pub mod repo;
pub mod suggest;

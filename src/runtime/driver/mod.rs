//! Terminal hosts for a [`Dashboard`](super::Dashboard).

pub mod cli;

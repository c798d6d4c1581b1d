//! Test suites for the pool supervisor.

mod launch_behaviour;
mod support;

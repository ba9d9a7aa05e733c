// Library root
// -----------
// This crate exposes the pieces the `webapi` binary is built from. The
// binary (`main.rs`) parses arguments, builds a gateway session and hands
// both to the runner.
//
// Module responsibilities:
// - `args`: turns the command line into a `Request`.
// - `config`: credentials and gateway settings read from the environment.
// - `client`: the `WebSession` interface the runner talks to.
// - `gateway`: the HTTP implementation of `WebSession`.
// - `runner`: prompt augmentation, dispatch, image fallback and saving.
// - `render`: plain-text and JSON output.
// - `error`: the failure categories of one invocation.
// - `logging`: tracing setup and stderr status lines.
//
// Keeping the session behind a trait lets the runner be tested against a
// scripted session instead of the real backend.
pub mod args;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod render;
pub mod runner;

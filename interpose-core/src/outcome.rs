//! Result envelope returned by behaviors and the transport.

use crate::Response;
use crate::context::Context;

/// A response, optionally paired with a background continuation.
///
/// - [`Outcome::immediate`]: the response is all there is.
/// - [`Outcome::with_continuation`]: the response goes to the caller right
///   away and the pipeline is re-run for the attached context in the
///   background.
#[derive(Debug)]
pub struct Outcome {
    response: Response,
    continuation: Option<Context>,
}

impl Outcome {
    /// Outcome without a continuation.
    pub fn immediate(response: Response) -> Self {
        Self {
            response,
            continuation: None,
        }
    }

    /// Outcome whose `background` context is re-executed after the response is
    /// handed to the caller.
    pub fn with_continuation(response: Response, background: Context) -> Self {
        Self {
            response,
            continuation: Some(background),
        }
    }

    /// Returns `true` if a background continuation is attached.
    pub fn has_continuation(&self) -> bool {
        self.continuation.is_some()
    }

    /// Returns the response.
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Returns a mutable reference to the response.
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Returns the continuation context, if any.
    pub fn continuation(&self) -> Option<&Context> {
        self.continuation.as_ref()
    }

    /// Detaches the continuation, leaving an immediate outcome.
    pub fn take_continuation(&mut self) -> Option<Context> {
        self.continuation.take()
    }

    /// Consumes the outcome, discarding any continuation.
    pub fn into_response(self) -> Response {
        self.response
    }

    /// Splits the outcome into response and continuation.
    pub fn into_parts(self) -> (Response, Option<Context>) {
        (self.response, self.continuation)
    }

    /// Rebuilds an outcome from its parts.
    pub fn from_parts(response: Response, continuation: Option<Context>) -> Self {
        Self {
            response,
            continuation,
        }
    }
}

impl From<Response> for Outcome {
    fn from(response: Response) -> Self {
        Outcome::immediate(response)
    }
}

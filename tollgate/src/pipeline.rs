//! Request handler chain.
//!
//! A [`Pipeline`] runs a list of [`Middleware`] stages in insertion order
//! and then the endpoint. Each stage decides whether to call
//! [`Next::run`]; a stage that returns early stops the chain.
//!
//! ```
//! use tollgate::{AccessError, Pipeline, RequestContext};
//!
//! let pipeline: Pipeline<&str, String, AccessError> =
//!     Pipeline::new(|input: &str, _ctx: &mut RequestContext| Ok(input.to_uppercase()))
//!         .stage_fn(|input, ctx, next| {
//!             // runs before the endpoint
//!             next.run(input, ctx)
//!         });
//!
//! let mut ctx = RequestContext::new();
//! assert_eq!(pipeline.handle("hi", &mut ctx).unwrap(), "HI");
//! ```

use crate::context::RequestContext;

/// Terminal handler of a pipeline.
pub type Endpoint<I, O, E> = dyn Fn(I, &mut RequestContext) -> Result<O, E> + Send + Sync;

/// One stage of the chain.
pub trait Middleware<I, O, E>: Send + Sync {
    fn handle(&self, input: I, ctx: &mut RequestContext, next: Next<'_, I, O, E>) -> Result<O, E>;
}

/// The remainder of the chain after the current stage.
pub struct Next<'a, I, O, E> {
    stages: &'a [Box<dyn Middleware<I, O, E>>],
    endpoint: &'a Endpoint<I, O, E>,
}

impl<I, O, E> Next<'_, I, O, E> {
    /// Continue with the next stage, or the endpoint after the last one.
    pub fn run(self, input: I, ctx: &mut RequestContext) -> Result<O, E> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.handle(
                input,
                ctx,
                Next {
                    stages: rest,
                    endpoint: self.endpoint,
                },
            ),
            None => (self.endpoint)(input, ctx),
        }
    }
}

/// Middleware built from a closure, see [`Pipeline::stage_fn`].
pub struct FromFn<F>(F);

impl<I, O, E, F> Middleware<I, O, E> for FromFn<F>
where
    F: Fn(I, &mut RequestContext, Next<'_, I, O, E>) -> Result<O, E> + Send + Sync,
{
    fn handle(&self, input: I, ctx: &mut RequestContext, next: Next<'_, I, O, E>) -> Result<O, E> {
        (self.0)(input, ctx, next)
    }
}

/// Ordered stages in front of an endpoint.
pub struct Pipeline<I, O, E> {
    stages: Vec<Box<dyn Middleware<I, O, E>>>,
    endpoint: Box<Endpoint<I, O, E>>,
}

impl<I, O, E> Pipeline<I, O, E> {
    pub fn new<F>(endpoint: F) -> Self
    where
        F: Fn(I, &mut RequestContext) -> Result<O, E> + Send + Sync + 'static,
    {
        Self {
            stages: Vec::new(),
            endpoint: Box::new(endpoint),
        }
    }

    /// Append a stage; stages run in the order they are added.
    pub fn stage(mut self, stage: impl Middleware<I, O, E> + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Append a closure stage.
    pub fn stage_fn<F>(self, f: F) -> Self
    where
        F: Fn(I, &mut RequestContext, Next<'_, I, O, E>) -> Result<O, E> + Send + Sync + 'static,
    {
        self.stage(FromFn(f))
    }

    /// Run the chain for one request.
    pub fn handle(&self, input: I, ctx: &mut RequestContext) -> Result<O, E> {
        Next {
            stages: &self.stages,
            endpoint: self.endpoint.as_ref(),
        }
        .run(input, ctx)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<I, O, E> std::fmt::Debug for Pipeline<I, O, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish_non_exhaustive()
    }
}

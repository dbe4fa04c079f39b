//! Programmatic checks against the current request's user.
//!
//! Use these inside a handler to branch on a token without denying the
//! whole call, e.g. to hide an admin-only field.

use crate::context::RequestContext;
use crate::error::ResolveError;
use crate::evaluator::TokenEvaluator;

/// Whether the current user holds `token`.
pub fn has_token(
    evaluator: &dyn TokenEvaluator,
    token: &str,
    ctx: &RequestContext,
) -> Result<bool, ResolveError> {
    evaluator.evaluate_all_of(ctx.user_id(), &[token.to_string()], ctx)
}

/// Whether the current user holds every one of `tokens`.
pub fn has_all_of(
    evaluator: &dyn TokenEvaluator,
    tokens: &[String],
    ctx: &RequestContext,
) -> Result<bool, ResolveError> {
    evaluator.evaluate_all_of(ctx.user_id(), tokens, ctx)
}

/// Whether the current user holds at least one of `tokens`.
pub fn has_any_of(
    evaluator: &dyn TokenEvaluator,
    tokens: &[String],
    ctx: &RequestContext,
) -> Result<bool, ResolveError> {
    evaluator.evaluate_any_of(ctx.user_id(), tokens, ctx)
}

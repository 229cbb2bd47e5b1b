//! Provider selection for service auto-assignment

use crate::model::ServiceProvider;

/// Pick the best provider for a request category: verified providers only,
/// highest rating wins, and the first candidate is kept on a rating tie so
/// selection is deterministic over a stable listing order.
pub fn select_provider<'a>(
    providers: &'a [ServiceProvider],
    category: &str,
) -> Option<&'a ServiceProvider> {
    providers
        .iter()
        .filter(|p| p.verified && p.category == category)
        .fold(None, |best: Option<&ServiceProvider>, candidate| match best {
            Some(current) if current.rating >= candidate.rating => Some(current),
            _ => Some(candidate),
        })
}

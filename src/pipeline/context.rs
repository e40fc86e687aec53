//! Operation Identity and Call Context
//!
//! Types naming the logical operation being intercepted and carrying the
//! per-call ambient dimensions (locale, currency, session) that cache keys
//! and strategies may depend on.

use serde::Serialize;

// == Operation Kind ==
/// Whether an operation reads or writes provider state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OpKind {
    /// Read-only operation, eligible for caching
    Query,
    /// State-changing operation; never cached, triggers invalidation
    Mutation,
}

// == Operation Identity ==
/// Logical identity of a provider operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpIdentity {
    /// Name of the back-end provider exposing the operation
    pub provider: String,
    /// Resource scope the operation touches (e.g. "product", "cart")
    pub scope: String,
    /// Method name within the provider
    pub method: String,
    /// Read/write classification
    pub kind: OpKind,
}

impl OpIdentity {
    /// Identity for a read operation.
    pub fn query(
        provider: impl Into<String>,
        scope: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            scope: scope.into(),
            method: method.into(),
            kind: OpKind::Query,
        }
    }

    /// Identity for a write operation.
    pub fn mutation(
        provider: impl Into<String>,
        scope: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            scope: scope.into(),
            method: method.into(),
            kind: OpKind::Mutation,
        }
    }

    /// Dotted display form used in logs and instrumentation.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.provider, self.scope, self.method)
    }
}

// == Call Context ==
/// Ambient dimensions of a single call.
///
/// An operation's result may vary by locale or currency; the default
/// strategy folds both into the cache key so variants never collide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OpContext {
    /// BCP-47 locale tag, e.g. "en-US"
    pub locale: Option<String>,
    /// ISO-4217 currency code, e.g. "EUR"
    pub currency: Option<String>,
    /// Opaque session identifier; personalized scopes are never cached
    pub session_id: Option<String>,
}

impl OpContext {
    /// Context with locale and currency set.
    pub fn localized(locale: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            locale: Some(locale.into()),
            currency: Some(currency.into()),
            session_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_constructors() {
        let query = OpIdentity::query("bigcommerce", "product", "get_product");
        assert_eq!(query.kind, OpKind::Query);
        assert_eq!(query.qualified_name(), "bigcommerce.product.get_product");

        let mutation = OpIdentity::mutation("bigcommerce", "cart", "add_item");
        assert_eq!(mutation.kind, OpKind::Mutation);
    }

    #[test]
    fn test_localized_context() {
        let ctx = OpContext::localized("de-DE", "EUR");
        assert_eq!(ctx.locale.as_deref(), Some("de-DE"));
        assert_eq!(ctx.currency.as_deref(), Some("EUR"));
        assert!(ctx.session_id.is_none());
    }
}

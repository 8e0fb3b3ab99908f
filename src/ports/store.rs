use crate::push_types::Subscription;

/// Persistence capability behind the subscription registry.
///
/// The registry only ever needs these three operations, so any key-value
/// backend can stand in for the in-memory adapter without the dispatcher
/// noticing. `add` answers whether the endpoint was newly inserted; `remove`
/// whether it was present. `list` is a point-in-time copy in insertion order;
/// callers must not assume it stays valid across concurrent mutation.
pub trait SubscriptionStore: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type AddFut<'a>: Future<Output = Result<bool, Self::Error>> + Send + 'a
    where
        Self: 'a;
    type RemoveFut<'a>: Future<Output = Result<bool, Self::Error>> + Send + 'a
    where
        Self: 'a;
    type ListFut<'a>: Future<Output = Result<Vec<Subscription>, Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn add<'a>(&'a self, subscription: Subscription) -> Self::AddFut<'a>;
    fn remove<'a>(&'a self, endpoint: &'a str) -> Self::RemoveFut<'a>;
    fn list<'a>(&'a self) -> Self::ListFut<'a>;
}

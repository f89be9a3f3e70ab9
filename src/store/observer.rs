/// Handle returned by `subscribe`, used to unsubscribe later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Box<dyn FnMut(&[T]) + Send>;

/// Change listeners for a store snapshot of `T`s
pub struct Subscribers<T> {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            callbacks: Vec::new(),
        }
    }
}

impl<T> Subscribers<T> {
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&[T]) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        self.callbacks.len() != before
    }

    pub fn notify(&mut self, snapshot: &[T]) {
        for (_, callback) in self.callbacks.iter_mut() {
            callback(snapshot);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn notifies_until_unsubscribed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut subs: Subscribers<u32> = Subscribers::default();

        let sink = seen.clone();
        let id = subs.subscribe(move |items| sink.lock().unwrap().push(items.len()));

        subs.notify(&[1, 2]);
        assert!(subs.unsubscribe(id));
        assert!(!subs.unsubscribe(id));
        subs.notify(&[1, 2, 3]);

        assert_eq!(*seen.lock().unwrap(), vec![2]);
        assert!(subs.is_empty());
    }
}

//! Cart store: a cart behind a mutex, written through to a persistence
//! backend and observable by subscribers.
//!
//! Every mutator applies its transition under the lock, saves the new state
//! while still holding it, then notifies subscribers after releasing it.
//! Saving is best-effort: a failed save is logged and the in-memory change
//! stands. Operations that leave the cart unchanged neither save nor notify.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cartwheel_core::{Product, ProductId};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::cart::{Cart, CartLine, CartOp};
use crate::persistence::{self, PersistenceBackend};

/// What happened to the cart, passed to subscribers with the new state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// A transition changed the cart.
    Applied(CartOp),
    /// The cart was replaced by the persisted state (or reset to empty).
    Restored,
}

/// Handle returned by [`CartStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&CartEvent, &Cart) + Send + Sync>;

/// Owns a cart and keeps its persisted copy in step.
pub struct CartStore<B> {
    cart: Mutex<Cart>,
    backend: B,
    key: String,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
}

impl<B: PersistenceBackend> CartStore<B> {
    /// Create a store for the slot `key` and restore whatever was saved there.
    pub fn open(backend: B, key: impl Into<String>) -> Self {
        let store = Self {
            cart: Mutex::new(Cart::new()),
            backend,
            key: key.into(),
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        };
        store.restore();
        store
    }

    /// Storage key this store reads and writes.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replace the in-memory cart with the persisted one.
    ///
    /// Missing, unreadable or malformed data yields an empty cart. Never
    /// fails.
    pub fn restore(&self) {
        let restored = match self.backend.load(&self.key) {
            Ok(Some(data)) => match persistence::decode(&data) {
                Ok(cart) => {
                    debug!(key = %self.key, lines = cart.lines().len(), "Restored cart");
                    cart
                }
                Err(e) => {
                    warn!(key = %self.key, error = %e, "Discarding malformed cart data");
                    Cart::new()
                }
            },
            Ok(None) => Cart::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to load cart, starting empty");
                Cart::new()
            }
        };

        let snapshot = {
            let mut cart = self.lock_cart();
            *cart = restored;
            cart.clone()
        };
        self.notify(&CartEvent::Restored, &snapshot);
    }

    /// Add `quantity` of `product`; quantities below 1 count as 1.
    pub fn add_item(&self, product: &Product, quantity: i64) -> bool {
        self.dispatch(CartOp::Add {
            product: product.snapshot(),
            quantity,
        })
    }

    /// Set a line's quantity; `quantity <= 0` removes the line.
    pub fn update_quantity(&self, product_id: &ProductId, quantity: i64) -> bool {
        self.dispatch(CartOp::UpdateQuantity {
            product_id: product_id.clone(),
            quantity,
        })
    }

    pub fn remove_item(&self, product_id: &ProductId) -> bool {
        self.dispatch(CartOp::Remove {
            product_id: product_id.clone(),
        })
    }

    pub fn increment(&self, product_id: &ProductId) -> bool {
        self.dispatch(CartOp::Increment {
            product_id: product_id.clone(),
        })
    }

    /// One fewer of a line; a line at quantity 1 is left alone.
    pub fn decrement(&self, product_id: &ProductId) -> bool {
        self.dispatch(CartOp::Decrement {
            product_id: product_id.clone(),
        })
    }

    pub fn clear_cart(&self) -> bool {
        self.dispatch(CartOp::Clear)
    }

    /// Apply a transition, persist and notify. Returns `true` if the cart
    /// changed.
    pub fn dispatch(&self, op: CartOp) -> bool {
        let snapshot = {
            let mut cart = self.lock_cart();
            if !cart.apply(op.clone()) {
                debug!(product = ?op.product_id(), "Cart operation left cart unchanged");
                return false;
            }
            // Saved under the lock so stored state never lags a later mutation.
            self.persist(&cart);
            cart.clone()
        };
        self.notify(&CartEvent::Applied(op), &snapshot);
        true
    }

    /// Copy of the current cart.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.lock_cart().clone()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.lock_cart().lines().to_vec()
    }

    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lock_cart().item_count()
    }

    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lock_cart().total()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_cart().is_empty()
    }

    /// Register a callback run after every change, with the event and the
    /// cart as it stands after it.
    ///
    /// Callbacks run synchronously on the mutating thread, outside the
    /// store's locks, so they may read from or mutate the store.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&CartEvent, &Cart) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.lock_listeners().push((id, Arc::new(listener)));
        id
    }

    /// Remove a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn persist(&self, cart: &Cart) {
        let result = persistence::encode(cart)
            .and_then(|data| self.backend.save(&self.key, &data));
        match result {
            Ok(()) => debug!(key = %self.key, items = cart.item_count(), "Persisted cart"),
            Err(e) => warn!(key = %self.key, error = %e, "Failed to persist cart"),
        }
    }

    fn notify(&self, event: &CartEvent, cart: &Cart) {
        let listeners: Vec<Listener> = self
            .lock_listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event, cart);
        }
    }

    // Every transition leaves the cart consistent, so a poisoned lock still
    // guards a valid cart.
    fn lock_cart(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Listener)>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B> std::fmt::Debug for CartStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("key", &self.key)
            .field("cart", &self.cart)
            .finish_non_exhaustive()
    }
}

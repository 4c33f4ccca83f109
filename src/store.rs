use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use derive_ex::derive_ex;
use slabmap::SlabMap;

use crate::Subscription;


type Listener<T> = Rc<dyn Fn(&T)>;

/// Observable value shared between the form controller and its bindings.
///
/// Updates are copy-on-write: the stored value is an immutable snapshot that is swapped as a whole,
/// so listeners never observe a partially modified value.
#[derive_ex(Clone, bound())]
pub struct Store<T: 'static>(Rc<StoreNode<T>>);

impl<T: 'static> Store<T> {
    /// Create a new `Store` with the given initial value.
    pub fn new(value: T) -> Self {
        Self(Rc::new(StoreNode {
            value: RefCell::new(Rc::new(value)),
            listeners: RefCell::new(SlabMap::new()),
            notifying: Cell::new(false),
            pending: Cell::new(false),
        }))
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        T::clone(&self.snapshot())
    }

    /// Returns the current snapshot without cloning the value.
    pub fn snapshot(&self) -> Rc<T> {
        self.0.value.borrow().clone()
    }

    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        f(&self.snapshot())
    }

    /// Replaces the value and notifies the listeners.
    pub fn set(&self, value: T) {
        *self.0.value.borrow_mut() = Rc::new(value);
        self.notify();
    }

    /// Replaces the value with an existing snapshot and notifies the listeners.
    pub fn set_rc(&self, value: Rc<T>) {
        *self.0.value.borrow_mut() = value;
        self.notify();
    }

    /// Replaces the value with the result of `f`, which receives a copy of the current value.
    pub fn update(&self, f: impl FnOnce(T) -> T)
    where
        T: Clone,
    {
        let value = f(self.get());
        self.set(value);
    }

    /// Registers `f` to be called with the current value now and after every change.
    ///
    /// The listener stays registered until the returned [`Subscription`] is dropped.
    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> Subscription {
        let listener: Listener<T> = Rc::new(f);
        listener(&self.snapshot());
        let key = self.0.listeners.borrow_mut().insert(listener);
        Subscription::from_weak_fn(Rc::downgrade(&self.0), move |node: Rc<StoreNode<T>>| {
            node.listeners.borrow_mut().remove(key);
        })
    }

    pub fn listener_count(&self) -> usize {
        self.0.listeners.borrow().len()
    }

    fn notify(&self) {
        let node = &self.0;
        if node.notifying.replace(true) {
            node.pending.set(true);
            return;
        }
        loop {
            let value = self.snapshot();
            let listeners: Vec<_> = node.listeners.borrow().values().cloned().collect();
            tracing::trace!(listeners = listeners.len(), "notify store listeners");
            for listener in listeners {
                listener(&value);
            }
            if !node.pending.replace(false) {
                break;
            }
        }
        node.notifying.set(false);
    }
}
impl<T: Default + 'static> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
impl<T: std::fmt::Debug + 'static> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&*self.snapshot(), f)
    }
}

struct StoreNode<T: 'static> {
    value: RefCell<Rc<T>>,
    listeners: RefCell<SlabMap<Listener<T>>>,
    notifying: Cell<bool>,
    pending: Cell<bool>,
}

//! Bindings: the boundary consumed by view layers.
//!
//! A view layer (a DOM wrapper, a component renderer) takes parameters that
//! are either a plain value or something reactive. [`Binding<T>`] makes that
//! choice explicit. It is resolved once, when applied:
//!
//! - [`Binding::Literal`] hands its value to the sink once.
//! - [`Binding::Derived`] installs a reaction that re-applies the value to
//!   the sink every time a signal read by the derivation changes.
//!
//! ```rust,ignore
//! let (name, set_name) = runtime.create_state("world".to_string());
//! let label: Binding<String> = Binding::derived(move || format!("hello {}", name.get()));
//! label.apply(&runtime, move |text| node.set_text(&text));
//!
//! set_name.set("reaper".to_string()); // the node text updates
//! ```
//!
//! Two-way bindings go through a signal's getter/setter pair: the getter
//! drives the display and the setter is the only write-back channel, see
//! [`bind_two_way`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::graph::SubscriberId;
use crate::reactive::{Memo, ReadSignal, Runtime, Signal, WriteSignal};

/// A value or a reactive derivation of one.
pub enum Binding<T: 'static> {
    Literal(T),
    Derived(Rc<dyn Fn() -> T>),
}

impl<T: 'static> Binding<T> {
    pub fn literal(value: T) -> Self {
        Binding::Literal(value)
    }

    pub fn derived(f: impl Fn() -> T + 'static) -> Self {
        Binding::Derived(Rc::new(f))
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, Binding::Derived(_))
    }

    /// Evaluate the binding once. A derived binding's reads are tracked by
    /// whatever subscriber is running.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        match self {
            Binding::Literal(value) => value.clone(),
            Binding::Derived(f) => f(),
        }
    }

    /// Resolve the binding into `sink`.
    ///
    /// Returns the id of the installed reaction for a derived binding and
    /// `None` for a literal. A sink that writes a signal its own derivation
    /// reads re-enters itself; the nested value is dropped with a warning
    /// and the outer application completes.
    pub fn apply(self, runtime: &Runtime, sink: impl FnMut(T) + 'static) -> Option<SubscriberId> {
        match self {
            Binding::Literal(value) => {
                let mut sink = sink;
                sink(value);
                None
            }
            Binding::Derived(f) => {
                let sink = RefCell::new(sink);
                let id = runtime.create_reaction(move || {
                    let value = f();
                    let Ok(mut apply) = sink.try_borrow_mut() else {
                        warn!("binding sink re-entered itself; nested value dropped");
                        return;
                    };
                    (*apply)(value);
                });
                Some(id)
            }
        }
    }

    /// Map the bound value. A literal stays a literal.
    pub fn map<U: 'static>(self, f: impl Fn(T) -> U + 'static) -> Binding<U> {
        match self {
            Binding::Literal(value) => Binding::Literal(f(value)),
            Binding::Derived(g) => Binding::Derived(Rc::new(move || f(g()))),
        }
    }
}

impl<T: Clone + 'static> Clone for Binding<T> {
    fn clone(&self) -> Self {
        match self {
            Binding::Literal(value) => Binding::Literal(value.clone()),
            Binding::Derived(f) => Binding::Derived(Rc::clone(f)),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Binding::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

impl From<&str> for Binding<String> {
    fn from(value: &str) -> Self {
        Binding::Literal(value.to_string())
    }
}

impl From<String> for Binding<String> {
    fn from(value: String) -> Self {
        Binding::Literal(value)
    }
}

impl<T: Clone + 'static> From<ReadSignal<T>> for Binding<T> {
    fn from(signal: ReadSignal<T>) -> Self {
        Binding::derived(move || signal.get())
    }
}

impl<T: Clone + 'static> From<Signal<T>> for Binding<T> {
    fn from(signal: Signal<T>) -> Self {
        signal.read_only().into()
    }
}

impl<T: Clone + 'static> From<Memo<T>> for Binding<T> {
    fn from(memo: Memo<T>) -> Self {
        Binding::derived(move || memo.get())
    }
}

/// Bind a getter/setter pair to a view.
///
/// The getter is displayed through `sink` by a reaction. The returned
/// handler is what the view calls with values coming back from outside
/// (user input, events); it writes through the setter, which re-displays.
pub fn bind_two_way<T: Clone + 'static>(
    runtime: &Runtime,
    (read, write): (ReadSignal<T>, WriteSignal<T>),
    sink: impl FnMut(T) + 'static,
) -> impl Fn(T) {
    Binding::from(read).apply(runtime, sink);
    move |value| write.set(value)
}

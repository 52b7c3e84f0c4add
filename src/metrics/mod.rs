//! Metrics and observability infrastructure.
//!
//! Counters are emitted through the `InternalEvent` trait so that call sites
//! stay declarative and the metric names live in one place.

pub mod events;

/// Macro for emitting metric events (Vector-style pattern).
///
/// This macro calls the `InternalEvent::emit()` method on the given event,
/// which records the corresponding counter metric.
///
/// # Example
///
/// ```ignore
/// use pregao::metrics::events::RecordsRefined;
///
/// emit!(RecordsRefined { count: 100 });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}

// Re-export the macro at crate root
pub use emit;

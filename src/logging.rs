//! Helper macro keeping `event` and `resource` fields on awaiter and probe logs.

/// Log an event about one resource plus any extra fields and a message.
///
/// ```ignore
/// resource_event!(debug, "resource_unavailable", resource = probe, attempt = 3; "not ready");
/// ```
#[macro_export]
macro_rules! resource_event {
    ($level:ident, $event:expr, resource = $resource:expr $(, $field:ident = $value:expr )* ; $($msg:tt)+) => {
        tracing::$level!(
            target: "await",
            event = $event,
            resource = %$resource,
            $($field = %$value,)*
            $($msg)+
        )
    };
    ($level:ident, $event:expr, resource = $resource:expr $(, $field:ident = $value:expr )* $(,)?) => {
        tracing::$level!(
            target: "await",
            event = $event,
            resource = %$resource,
            $($field = %$value,)*
        )
    };
}

//! Event-style emit macros.
//!
//! `log_info!(logger, "USER_CREATED", user_id = id, plan = "pro")` emits
//! `{"event": "USER_CREATED", "user_id": .., "plan": "pro"}` through `logger`.
//! The object is only built when the level is enabled.

/// Build the `{"event": .., key: value, ..}` payload for the emit macros.
///
/// Values that fail to serialize become `null`.
#[doc(hidden)]
#[macro_export]
macro_rules! __event_payload {
    ($event:expr $(, $key:ident = $value:expr)* $(,)?) => {{
        let mut fields = $crate::__private::serde_json::Map::new();
        fields.insert(
            "event".to_string(),
            $crate::__private::serde_json::Value::from($event),
        );
        $(
            fields.insert(
                stringify!($key).to_string(),
                $crate::__private::serde_json::to_value(&$value)
                    .unwrap_or($crate::__private::serde_json::Value::Null),
            );
        )*
        $crate::__private::serde_json::Value::Object(fields)
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_event {
    ($logger:expr, $severity:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {{
        let logger = &$logger;
        if logger.enabled($severity) {
            logger.log($severity, $crate::__event_payload!($event $(, $key = $value)*));
        }
    }};
}

/// Emit an event at info.
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::__log_event!($logger, $crate::Severity::Info, $event $(, $key = $value)*)
    };
}

/// Emit an event at warn.
#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::__log_event!($logger, $crate::Severity::Warn, $event $(, $key = $value)*)
    };
}

/// Emit an event at error.
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::__log_event!($logger, $crate::Severity::Error, $event $(, $key = $value)*)
    };
}

/// Emit an event at debug.
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::__log_event!($logger, $crate::Severity::Debug, $event $(, $key = $value)*)
    };
}

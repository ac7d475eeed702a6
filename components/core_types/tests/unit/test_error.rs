//! Unit tests for JsError and ErrorKind

use core_types::{ErrorKind, JsError, SourcePosition, StackFrame};

#[cfg(test)]
mod error_kind_tests {
    use super::*;

    #[test]
    fn test_error_kind_equality() {
        assert_eq!(ErrorKind::TypeError, ErrorKind::TypeError);
        assert_ne!(ErrorKind::TypeError, ErrorKind::RangeError);
    }

    #[test]
    fn test_error_kind_display_matches_constructor_name() {
        assert_eq!(ErrorKind::Error.to_string(), "Error");
        assert_eq!(ErrorKind::TypeError.to_string(), "TypeError");
        assert_eq!(ErrorKind::ReferenceError.to_string(), "ReferenceError");
        assert_eq!(ErrorKind::InternalError.to_string(), "InternalError");
    }
}

#[cfg(test)]
mod js_error_tests {
    use super::*;

    #[test]
    fn test_js_error_creation_minimal() {
        let error = JsError::type_error("undefined is not a function");

        assert!(matches!(error.kind, ErrorKind::TypeError));
        assert_eq!(error.message, "undefined is not a function");
        assert!(error.stack.is_empty());
        assert!(error.source_position.is_none());
    }

    #[test]
    fn test_js_error_with_source_position() {
        let error = JsError::error("Unexpected value").with_position(SourcePosition {
            line: 10,
            column: 5,
            offset: 150,
        });

        let pos = error.source_position.unwrap();
        assert_eq!(pos.line, 10);
        assert_eq!(pos.column, 5);
    }

    #[test]
    fn test_js_error_with_stack_frames() {
        let error = JsError::new(ErrorKind::ReferenceError, "x is not defined").with_stack(vec![
            StackFrame::named("task#1"),
            StackFrame::named("microtask#4"),
        ]);

        assert_eq!(error.stack.len(), 2);
        assert_eq!(error.stack[0].function_name.as_deref(), Some("task#1"));
        assert_eq!(error.stack[1].function_name.as_deref(), Some("microtask#4"));
    }

    #[test]
    fn test_aggregate_keeps_member_order() {
        let agg = JsError::aggregate(
            vec![JsError::error("first"), JsError::range_error("second")],
            "All promises were rejected",
        );

        assert_eq!(agg.kind, ErrorKind::AggregateError);
        assert_eq!(agg.errors[0].message, "first");
        assert_eq!(agg.errors[1].kind, ErrorKind::RangeError);
    }

    #[test]
    fn test_aggregate_of_zero_errors() {
        let agg = JsError::aggregate(Vec::new(), "All promises were rejected");
        assert!(agg.errors.is_empty());
        assert_eq!(agg.to_string(), "AggregateError: All promises were rejected");
    }

    #[test]
    fn test_js_error_clone_and_eq() {
        let error1 = JsError::error("boom").with_stack(vec![StackFrame::named("executor")]);
        let error2 = error1.clone();

        assert_eq!(error1, error2);
        assert_ne!(error1, JsError::error("other"));
    }

    #[test]
    fn test_js_error_is_std_error() {
        fn takes_error(_: &dyn std::error::Error) {}
        takes_error(&JsError::error("x"));
    }
}

//! Unit tests for SourcePosition and StackFrame

use core_types::{SourcePosition, StackFrame};

#[test]
fn test_source_position_equality() {
    let a = SourcePosition {
        line: 1,
        column: 1,
        offset: 0,
    };
    let b = a.clone();
    assert_eq!(a, b);
}

#[test]
fn test_named_frame_has_no_location() {
    let frame = StackFrame::named("microtask#2");
    assert_eq!(frame.function_name.as_deref(), Some("microtask#2"));
    assert!(frame.source_url.is_none());
    assert_eq!(frame.line, 0);
}

#[test]
fn test_anonymous_frame() {
    let frame = StackFrame::anonymous();
    assert!(frame.function_name.is_none());
    assert_eq!(frame.to_string(), "at <anonymous>");
}

#[test]
fn test_frame_display_with_location() {
    let frame = StackFrame {
        function_name: Some("onTimeout".to_string()),
        source_url: Some("file:///app.js".to_string()),
        line: 12,
        column: 3,
    };
    assert_eq!(frame.to_string(), "at onTimeout (file:///app.js:12:3)");
}

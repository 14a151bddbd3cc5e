//! Unit tests for `AppError` display format and I/O classification.

use std::io;
use std::path::Path;

use foothold_checkpoint::AppError;

#[test]
fn display_uses_lowercase_kind_prefix() {
    let cases = [
        (AppError::NotFound("x".into()), "not found: x"),
        (AppError::InvalidArgument("x".into()), "invalid argument: x"),
        (AppError::Validation("x".into()), "validation failed: x"),
        (AppError::PermissionDenied("x".into()), "permission denied: x"),
        (AppError::Cancelled("x".into()), "cancelled: x"),
        (AppError::Conflict("x".into()), "conflict: x"),
        (AppError::Config("x".into()), "config: x"),
        (AppError::Io("x".into()), "io: x"),
    ];

    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn error_message_no_trailing_period() {
    let err = AppError::Validation("checksum mismatch".into());
    let s = err.to_string();
    assert!(!s.ends_with('.'), "error message must not end with a period: {s}");
}

#[test]
fn io_not_found_and_permission_stay_distinct() {
    let path = Path::new("/srv/saves/foothold_syria.lua");

    let not_found = AppError::from_io("cannot open", path, &io::Error::from(io::ErrorKind::NotFound));
    let denied = AppError::from_io(
        "cannot open",
        path,
        &io::Error::from(io::ErrorKind::PermissionDenied),
    );
    let other = AppError::from_io("cannot open", path, &io::Error::other("disk on fire"));

    assert!(matches!(not_found, AppError::NotFound(_)));
    assert!(matches!(denied, AppError::PermissionDenied(_)));
    assert!(matches!(other, AppError::Io(_)));
    assert!(other.to_string().contains("foothold_syria.lua"));
}

#[test]
fn toml_errors_become_config_errors() {
    let err: AppError = toml::from_str::<toml::Value>("= broken")
        .map_err(AppError::from)
        .unwrap_err();
    assert!(err.to_string().starts_with("config:"), "{err}");
}

#[test]
fn error_implements_std_error_trait() {
    fn assert_error<E: std::error::Error>(_: &E) {}
    let err = AppError::Conflict("archive exists".into());
    assert_error(&err);
    assert!(format!("{err:?}").contains("Conflict"));
}

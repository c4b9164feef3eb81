use chargemanager::error::ChargeManagerError;

#[test]
fn error_constructors_build_matching_variants() {
    assert!(matches!(
        ChargeManagerError::config("x"),
        ChargeManagerError::Config { .. }
    ));
    assert!(matches!(
        ChargeManagerError::mqtt("x"),
        ChargeManagerError::Mqtt { .. }
    ));
    assert!(matches!(
        ChargeManagerError::io("x"),
        ChargeManagerError::Io { .. }
    ));
    assert!(matches!(
        ChargeManagerError::validation("f", "m"),
        ChargeManagerError::Validation { .. }
    ));
    assert!(matches!(
        ChargeManagerError::timeout("x"),
        ChargeManagerError::Timeout { .. }
    ));
}

#[test]
fn io_and_yaml_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    assert!(matches!(
        ChargeManagerError::from(io),
        ChargeManagerError::Io { .. }
    ));

    let yaml = serde_yaml::from_str::<serde_yaml::Value>("a: [b").unwrap_err();
    assert!(matches!(
        ChargeManagerError::from(yaml),
        ChargeManagerError::Serialization { .. }
    ));
}

#[test]
fn display_messages() {
    let e = ChargeManagerError::validation("vehicle.vin", "VIN must have 17 characters");
    let s = format!("{}", e);
    assert!(s.contains("Validation error"));
    assert!(s.contains("VIN must have 17 characters"));
}

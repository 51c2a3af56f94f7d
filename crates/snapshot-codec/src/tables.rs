//! Units catalog for snapshot metadata fields.

/// Metadata field names in wire order, paired with their units.
/// An empty string means the field is dimensionless or textual.
pub const UNITS: &[(&str, &str)] = &[
    ("version", ""),
    ("start_time", "Unix timestamp (UTC)"),
    ("station", ""),
    ("latitude", "degrees N"),
    ("longitude", "degrees E"),
    ("serialnum", ""),
    ("device_name", ""),
    ("label", ""),
    ("instrument", ""),
    ("exposure_time", "seconds"),
    ("x", "pixels"),
    ("y", "pixels"),
    ("width", "pixels"),
    ("height", "pixels"),
    ("bytes_per_pixel", "bytes"),
    ("bin_x", "pixels"),
    ("bin_y", "pixels"),
    ("ccd_temp", "degrees C"),
    ("set_point", "degrees C"),
    ("image_bytes", "bytes"),
];

/// Look up the units for a metadata field.
pub fn units(field: &str) -> Option<&'static str> {
    UNITS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, units)| *units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_lookup() {
        assert_eq!(units("latitude"), Some("degrees N"));
        assert_eq!(units("ccd_temp"), Some("degrees C"));
        assert_eq!(units("station"), Some(""));
        assert_eq!(units("no_such_field"), None);
    }
}
